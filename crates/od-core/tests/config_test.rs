use od_core::config::Config;

#[test]
fn default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.api.base_url, "http://127.0.0.1:8090");
    assert_eq!(cfg.api.timeout_secs, 5);
    assert_eq!(cfg.socket.url, "ws://127.0.0.1:8090/ws");
    assert_eq!(cfg.socket.backoff_base_ms, 1_000);
    assert_eq!(cfg.socket.backoff_cap_ms, 30_000);
    assert_eq!(cfg.poll.interval_secs, 30);
    assert_eq!(cfg.buffer.capacity, 5_000);
    assert_eq!(cfg.buffer.transcript_tail, 20);
    cfg.validate().expect("defaults validate");
}

#[test]
fn config_roundtrip() {
    let cfg = Config::default();
    let toml_str = cfg.to_toml().expect("serialize to toml");
    assert!(toml_str.contains("base_url"));

    let parsed: Config = toml::from_str(&toml_str).expect("parse toml back");
    assert_eq!(parsed.api.base_url, cfg.api.base_url);
    assert_eq!(parsed.poll.interval_secs, cfg.poll.interval_secs);
    assert_eq!(parsed.buffer.capacity, cfg.buffer.capacity);
    parsed.validate().expect("config validates");
}

#[test]
fn config_partial_toml() {
    let partial = r#"
[api]
base_url = "http://10.0.0.2:9999"

[poll]
interval_secs = 5
"#;
    let cfg: Config = toml::from_str(partial).expect("parse partial");
    assert_eq!(cfg.api.base_url, "http://10.0.0.2:9999");
    assert_eq!(cfg.poll.interval_secs, 5);
    // defaults fill in the rest
    assert_eq!(cfg.buffer.capacity, 5_000);
    assert_eq!(cfg.socket.backoff_cap_ms, 30_000);
    cfg.validate().expect("config validates");
}

#[test]
fn zero_poll_interval_fails_validation() {
    let mut cfg = Config::default();
    cfg.poll.interval_secs = 0;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("interval_secs"));
}

#[test]
fn backoff_cap_below_base_fails_validation() {
    let mut cfg = Config::default();
    cfg.socket.backoff_cap_ms = 10;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("backoff_cap_ms"));
}

//! Frame-to-snapshot flow: what the socket task does, minus the socket.

use od_client::service::StoreHandle;
use od_client::socket::parse_frame;
use od_core::types::{OrchestratorStatus, StageColor, StageRole};
use od_store::control::ControlView;
use od_store::store::{DashStore, StoreUpdate};

fn handle() -> (StoreHandle, flume::Receiver<od_store::store::DashSnapshot>) {
    StoreHandle::new(DashStore::new(5_000, 20))
}

fn feed(store: &StoreHandle, frame: &str) {
    let update = parse_frame(frame).expect("frame should parse");
    store.apply(update);
}

#[test]
fn connect_snapshot_then_events_yields_consistent_picture() {
    let (store, rx) = handle();
    store.apply(StoreUpdate::Connected);

    feed(
        &store,
        r#"{"type":"snapshot","data":{
            "workers":[{"issue":5,"status":"running","title":"Harden retry loop"}],
            "background":[{"name":"implement","status":"ok","enabled":true},
                          {"name":"pipeline_poller","status":"ok","enabled":true}],
            "orchestrator":"running",
            "limits":{"max_planners":2,"max_workers":4,"max_reviewers":2}
        }}"#,
    );
    feed(
        &store,
        r#"{"type":"worker_update","data":{"issue":9,"role":"review","status":"reviewing"}}"#,
    );
    feed(
        &store,
        r#"{"type":"transcript_line","data":{"issue":5,"line":"cargo test: 212 passed"}}"#,
    );

    let snap = rx.drain().last().expect("snapshots were published");
    assert!(snap.connected);
    assert_eq!(snap.control, ControlView::Stable(OrchestratorStatus::Running));
    assert_eq!(snap.limits.max_workers, 4);
    assert_eq!(snap.workers.len(), 2);
    assert_eq!(snap.derived.stages[&StageRole::Implement].active_workers, 1);
    assert_eq!(snap.derived.stages[&StageRole::Implement].color, StageColor::Green);
    assert_eq!(snap.derived.stages[&StageRole::Review].active_workers, 1);
    assert_eq!(snap.derived.loops["pipeline_poller"].color, StageColor::Green);
    assert_eq!(snap.feed.len(), 1);
    assert_eq!(snap.feed[0].lines, vec!["cargo test: 212 passed"]);
}

#[test]
fn unknown_frames_do_not_disturb_state() {
    let (store, rx) = handle();
    feed(
        &store,
        r#"{"type":"worker_update","data":{"issue":1,"status":"testing"}}"#,
    );
    assert!(parse_frame(r#"{"type":"cosmic_ray","data":{}}"#).is_none());
    assert!(parse_frame("garbage").is_none());

    let snap = rx.drain().last().unwrap();
    assert_eq!(snap.workers.len(), 1);
}

#[test]
fn reconnect_snapshot_supersedes_stale_worker_state() {
    let (store, rx) = handle();
    store.apply(StoreUpdate::Connected);
    feed(
        &store,
        r#"{"type":"worker_update","data":{"issue":1,"status":"running"}}"#,
    );
    store.apply(StoreUpdate::Disconnected);

    // Reconnect: the fresh snapshot replaces, never repairs.
    store.apply(StoreUpdate::Connected);
    feed(
        &store,
        r#"{"type":"snapshot","data":{"workers":[],"background":[],"orchestrator":"idle"}}"#,
    );

    let snap = rx.drain().last().unwrap();
    assert!(snap.connected);
    assert!(snap.workers.is_empty(), "slot 1 was evicted by the resync");
    assert_eq!(snap.control, ControlView::Stable(OrchestratorStatus::Idle));
}

#[test]
fn stop_hold_releases_on_terminal_event_frame() {
    let (store, rx) = handle();
    feed(
        &store,
        r#"{"type":"snapshot","data":{
            "workers":[{"issue":7,"status":"running"}],
            "background":[],"orchestrator":"running"}}"#,
    );
    feed(
        &store,
        r#"{"type":"snapshot","data":{
            "workers":[{"issue":7,"status":"running"}],
            "background":[],"orchestrator":"stopping"}}"#,
    );
    feed(
        &store,
        r#"{"type":"snapshot","data":{
            "workers":[{"issue":7,"status":"running"}],
            "background":[],"orchestrator":"idle"}}"#,
    );
    let snap = rx.drain().last().unwrap();
    assert_eq!(snap.control, ControlView::Holding, "worker 7 has not drained");

    feed(
        &store,
        r#"{"type":"worker_update","data":{"issue":7,"status":"done"}}"#,
    );
    let snap = rx.drain().last().unwrap();
    assert_eq!(snap.control, ControlView::Stable(OrchestratorStatus::Idle));
}

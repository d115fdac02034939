//! WebSocket adapter: one long-lived connection to the orchestrator's event
//! stream, reconnected with capped exponential backoff.
//!
//! There are no sequence numbers on the wire, so events missed during an
//! outage cannot be replayed; every (re)connect sends a `snapshot_request`
//! and the reply replaces the registry wholesale.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use od_core::types::{Event, EventKind, SnapshotPayload};
use od_store::store::StoreUpdate;

use crate::service::StoreHandle;

const SNAPSHOT_REQUEST: &str = r#"{"type":"snapshot_request"}"#;

/// Delay before reconnect attempt `attempt` (1-based): base doubling per
/// attempt, capped.
pub fn backoff_delay(attempt: u32, base_ms: u64, cap_ms: u64) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let ms = base_ms.saturating_mul(1u64 << exp).min(cap_ms);
    Duration::from_millis(ms)
}

#[derive(Debug, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse one text frame into a store update.
///
/// Malformed frames and unknown event kinds return `None` after a warning;
/// they must never reach the registry.
pub fn parse_frame(text: &str) -> Option<StoreUpdate> {
    let envelope: WireEnvelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "dropping unparseable socket frame");
            return None;
        }
    };

    if envelope.kind == "snapshot" {
        return match serde_json::from_value::<SnapshotPayload>(envelope.data) {
            Ok(snapshot) => Some(StoreUpdate::Resync(snapshot)),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed snapshot frame");
                None
            }
        };
    }

    let kind = match serde_json::from_value::<EventKind>(serde_json::Value::String(
        envelope.kind.clone(),
    )) {
        Ok(kind) => kind,
        Err(_) => {
            tracing::warn!(kind = %envelope.kind, "dropping event of unknown kind");
            return None;
        }
    };
    let timestamp = envelope.timestamp.unwrap_or_else(Utc::now);
    Some(StoreUpdate::Event(Event::new(kind, timestamp, envelope.data)))
}

/// Run the socket loop until the task is aborted.
pub async fn run_socket(url: String, store: StoreHandle, base_ms: u64, cap_ms: u64) {
    let mut attempt: u32 = 0;
    loop {
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                attempt = 0;
                tracing::info!(%url, "socket connected");
                store.apply(StoreUpdate::Connected);
                let (mut write, mut read) = ws.split();

                if let Err(e) = write.send(Message::Text(SNAPSHOT_REQUEST.into())).await {
                    tracing::warn!(error = %e, "snapshot request failed");
                } else {
                    while let Some(frame) = read.next().await {
                        match frame {
                            Ok(Message::Text(text)) => {
                                if let Some(update) = parse_frame(&text) {
                                    store.apply(update);
                                }
                            }
                            Ok(Message::Ping(data)) => {
                                let _ = write.send(Message::Pong(data)).await;
                            }
                            Ok(Message::Close(_)) => {
                                tracing::info!("socket closed by server");
                                break;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::warn!(error = %e, "socket read error");
                                break;
                            }
                        }
                    }
                }
                // Consumers keep the last-known state; nothing is cleared.
                store.apply(StoreUpdate::Disconnected);
            }
            Err(e) => {
                tracing::warn!(error = %e, "socket connect failed");
            }
        }

        attempt = attempt.saturating_add(1);
        let delay = backoff_delay(attempt, base_ms, cap_ms);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
        tokio::time::sleep(delay).await;
    }
}

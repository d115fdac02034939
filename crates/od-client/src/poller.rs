//! Fixed-interval REST poller.
//!
//! Runs independently of the socket; both can touch the same entities and
//! the store reconciles. Every request is stamped with the store epoch at
//! issue time so a completion that lands after a reconnect is dropped
//! instead of resurrecting pre-outage state.

use std::sync::Arc;
use std::time::Duration;

use od_store::store::StoreUpdate;

use crate::rest::ApiClient;
use crate::service::StoreHandle;

/// Poll all snapshot endpoints once.
///
/// Failures degrade per endpoint: the previous value stays and the failure
/// is logged, except the HITL list whose error state the backlog tracks
/// itself.
pub async fn poll_once(api: &ApiClient, store: &StoreHandle) {
    let epoch = store.epoch();
    store.with(|s| s.begin_hitl_fetch());

    let (issues, prs, hitl, sessions, status) = tokio::join!(
        api.fetch_issues(),
        api.fetch_prs(),
        api.fetch_hitl(),
        api.fetch_sessions(),
        api.fetch_status(),
    );

    match issues {
        Ok(issues) => store.apply(StoreUpdate::Issues { epoch, issues }),
        Err(e) => tracing::warn!(error = %e, "issue poll failed; keeping previous"),
    }
    match prs {
        Ok(prs) => store.apply(StoreUpdate::Prs { epoch, prs }),
        Err(e) => tracing::warn!(error = %e, "pr poll failed; keeping previous"),
    }
    store.apply(StoreUpdate::Hitl {
        epoch,
        result: hitl.map_err(|e| e.to_string()),
    });
    match sessions {
        Ok(sessions) => store.apply(StoreUpdate::Sessions { epoch, sessions }),
        Err(e) => tracing::warn!(error = %e, "session poll failed; keeping previous"),
    }
    match status {
        Ok(status) => store.apply(StoreUpdate::ControlPlane {
            epoch,
            orchestrator: status.orchestrator,
            background: status.background,
            limits: status.limits,
        }),
        Err(e) => tracing::warn!(error = %e, "status poll failed; keeping previous"),
    }
}

/// Poll on a fixed interval, or sooner when a refresh is triggered. Exits
/// when the refresh channel closes (service teardown).
pub async fn run_poller(
    api: Arc<ApiClient>,
    store: StoreHandle,
    interval: Duration,
    refresh_rx: flume::Receiver<()>,
) {
    loop {
        poll_once(&api, &store).await;
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            trigger = refresh_rx.recv_async() => {
                if trigger.is_err() {
                    break;
                }
                // Collapse a burst of refresh requests into one poll.
                while refresh_rx.try_recv().is_ok() {}
            }
        }
    }
}

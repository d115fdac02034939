//! Wires the transports, the store and the presentation surface together.
//!
//! The store lives behind one mutex; every apply is synchronous while the
//! lock is held, so no handler can observe a half-applied state. After each
//! mutation a fresh [`DashSnapshot`] is published to the UI channel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use od_core::config::Config;
use od_store::store::{DashSnapshot, DashStore, StoreUpdate};

use crate::poller::run_poller;
use crate::rest::ApiClient;
use crate::socket::run_socket;

// ---------------------------------------------------------------------------
// StoreHandle
// ---------------------------------------------------------------------------

/// Shared access to the store for the adapter tasks. Cheap to clone.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<Mutex<DashStore>>,
    snapshot_tx: flume::Sender<DashSnapshot>,
}

impl StoreHandle {
    pub fn new(store: DashStore) -> (Self, flume::Receiver<DashSnapshot>) {
        let (snapshot_tx, snapshot_rx) = flume::unbounded();
        (
            Self {
                store: Arc::new(Mutex::new(store)),
                snapshot_tx,
            },
            snapshot_rx,
        )
    }

    /// Run a synchronous closure against the store, then publish a snapshot.
    ///
    /// The closure must not block or await; everything inside runs under the
    /// store lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut DashStore) -> R) -> R {
        let mut store = self.store.lock().expect("store lock poisoned");
        let out = f(&mut store);
        let _ = self.snapshot_tx.send(store.snapshot());
        out
    }

    pub fn apply(&self, update: StoreUpdate) {
        self.with(|s| s.apply(update));
    }

    /// The epoch to stamp on a poll request at issue time.
    pub fn epoch(&self) -> u64 {
        self.store.lock().expect("store lock poisoned").epoch()
    }
}

// ---------------------------------------------------------------------------
// Actions dispatched by the presentation surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Action {
    Refresh,
    StartPipeline,
    StopPipeline,
    Correct { issue: u64, text: String },
    Skip { issue: u64 },
    RequestClose { issue: u64 },
    CancelClose,
    ConfirmClose { issue: u64 },
    SelectSession { id: String },
    ClearSessionSelection,
    ToggleRepoCollapsed { repo: String },
}

pub async fn handle_action(
    api: &ApiClient,
    store: &StoreHandle,
    refresh_tx: &flume::Sender<()>,
    action: Action,
) {
    match action {
        Action::Refresh => {
            let _ = refresh_tx.try_send(());
        }
        Action::StartPipeline => {
            if let Err(e) = api.control_start().await {
                tracing::warn!(error = %e, "start request failed");
            }
            let _ = refresh_tx.try_send(());
        }
        Action::StopPipeline => {
            if let Err(e) = api.control_stop().await {
                tracing::warn!(error = %e, "stop request failed");
            }
            let _ = refresh_tx.try_send(());
        }
        Action::Correct { issue, text } => {
            let begun = store.with(|s| s.begin_correct(issue, &text));
            match begun {
                Ok(()) => {
                    let result = api
                        .hitl_correct(issue, &text)
                        .await
                        .map_err(|e| e.to_string());
                    finish_hitl_action(api, store, issue, result).await;
                }
                Err(e) => reject_hitl_action(store, issue, e),
            }
        }
        Action::Skip { issue } => {
            let begun = store.with(|s| s.begin_skip(issue));
            match begun {
                Ok(()) => {
                    let result = api.hitl_skip(issue).await.map_err(|e| e.to_string());
                    finish_hitl_action(api, store, issue, result).await;
                }
                Err(e) => reject_hitl_action(store, issue, e),
            }
        }
        Action::RequestClose { issue } => {
            if let Err(e) = store.with(|s| s.request_close(issue)) {
                tracing::warn!(issue, error = %e, "close request rejected");
            }
        }
        Action::CancelClose => {
            store.with(|s| s.cancel_close());
        }
        Action::ConfirmClose { issue } => {
            let begun = store.with(|s| s.begin_close(issue));
            match begun {
                Ok(()) => {
                    let result = api.hitl_close(issue).await.map_err(|e| e.to_string());
                    finish_hitl_action(api, store, issue, result).await;
                }
                Err(e) => reject_hitl_action(store, issue, e),
            }
        }
        Action::SelectSession { id } => {
            store.with(|s| s.select_session(&id));
        }
        Action::ClearSessionSelection => {
            store.with(|s| s.clear_session_selection());
        }
        Action::ToggleRepoCollapsed { repo } => {
            store.with(|s| s.toggle_repo_collapsed(&repo));
        }
    }
}

/// Record the POST outcome, then unconditionally refetch the backlog. The
/// refetch, not the POST reply, is what removes an item.
async fn finish_hitl_action(
    api: &ApiClient,
    store: &StoreHandle,
    issue: u64,
    result: Result<(), String>,
) {
    store.apply(StoreUpdate::HitlActionDone { issue, result });
    let epoch = store.epoch();
    store.with(|s| s.begin_hitl_fetch());
    let fetched = api.fetch_hitl().await.map_err(|e| e.to_string());
    store.apply(StoreUpdate::Hitl {
        epoch,
        result: fetched,
    });
}

/// A client-side rejection (validation, action already in flight): no POST
/// is issued; the error is pinned inline on the item.
fn reject_hitl_action(store: &StoreHandle, issue: u64, error: od_store::hitl::HitlError) {
    tracing::debug!(issue, error = %error, "hitl action rejected client-side");
    store.apply(StoreUpdate::HitlActionDone {
        issue,
        result: Err(error.to_string()),
    });
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Channel ends the presentation surface holds. Dropping `actions` tears the
/// service down: the adapter tasks are aborted and any in-flight completion
/// lands in a dropped store.
pub struct ServiceHandle {
    pub snapshots: flume::Receiver<DashSnapshot>,
    pub actions: flume::Sender<Action>,
}

/// Spawn the whole client stack on a background thread with its own
/// single-threaded runtime.
pub fn spawn(cfg: Config) -> ServiceHandle {
    let (action_tx, action_rx) = flume::unbounded::<Action>();
    let (handle, snapshot_rx) =
        StoreHandle::new(DashStore::new(cfg.buffer.capacity, cfg.buffer.transcript_tail));

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio runtime");
        rt.block_on(async move {
            let api = Arc::new(ApiClient::new(
                &cfg.api.base_url,
                Duration::from_secs(cfg.api.timeout_secs),
            ));
            let (refresh_tx, refresh_rx) = flume::bounded::<()>(4);

            let socket = tokio::spawn(run_socket(
                cfg.socket.url.clone(),
                handle.clone(),
                cfg.socket.backoff_base_ms,
                cfg.socket.backoff_cap_ms,
            ));
            let poller = tokio::spawn(run_poller(
                Arc::clone(&api),
                handle.clone(),
                Duration::from_secs(cfg.poll.interval_secs),
                refresh_rx,
            ));

            while let Ok(action) = action_rx.recv_async().await {
                handle_action(&api, &handle, &refresh_tx, action).await;
            }

            // Teardown: the UI dropped its handle.
            socket.abort();
            poller.abort();
        });
    });

    ServiceHandle {
        snapshots: snapshot_rx,
        actions: action_tx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use od_core::types::{Event, EventKind};

    #[test]
    fn every_mutation_publishes_a_snapshot() {
        let (handle, rx) = StoreHandle::new(DashStore::new(100, 10));
        handle.apply(StoreUpdate::Connected);
        handle.apply(StoreUpdate::Event(Event::new(
            EventKind::WorkerUpdate,
            Utc::now(),
            serde_json::json!({"issue": 1, "status": "running"}),
        )));

        let snaps: Vec<_> = rx.drain().collect();
        assert_eq!(snaps.len(), 2);
        assert!(snaps[0].connected);
        assert_eq!(snaps[1].workers.len(), 1);
    }

    #[test]
    fn epoch_reads_do_not_publish() {
        let (handle, rx) = StoreHandle::new(DashStore::new(100, 10));
        let _ = handle.epoch();
        assert!(rx.is_empty());
    }
}

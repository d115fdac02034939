use std::collections::BTreeMap;
use std::sync::Arc;

use od_core::types::{
    BackgroundWorkerState, ConcurrencyLimits, Event, EventKind, HitlItem, OrchestratorStatus,
    PipelineIssues, PipelineSession, PullRequest, SnapshotPayload, Worker,
};

use crate::buffer::EventBuffer;
use crate::control::{ControlState, ControlView};
use crate::derive::{DeriveCache, DerivedStatus};
use crate::hitl::{HitlBacklog, HitlError};
use crate::registry::{patch_from_event, FeedGroup, WorkerRegistry};
use crate::sessions::{group_by_repo, RepoGroup, SessionSelection};

/// How much of the event log the stream view receives per snapshot.
const EVENT_TAIL: usize = 200;

// ---------------------------------------------------------------------------
// StoreUpdate — every mutation enters through this enum
// ---------------------------------------------------------------------------

/// One normalized update from either transport.
///
/// Poll results carry the store epoch observed when the request was issued;
/// a completion from a previous epoch (pre-reconnect, or post-teardown) is
/// dropped instead of applied.
#[derive(Debug)]
pub enum StoreUpdate {
    Connected,
    Disconnected,
    Event(Event),
    /// Full-state reply to a `snapshot_request`; replaces, never repairs.
    Resync(SnapshotPayload),
    Issues {
        epoch: u64,
        issues: PipelineIssues,
    },
    Prs {
        epoch: u64,
        prs: Vec<PullRequest>,
    },
    Hitl {
        epoch: u64,
        result: Result<Vec<HitlItem>, String>,
    },
    Sessions {
        epoch: u64,
        sessions: Vec<PipelineSession>,
    },
    ControlPlane {
        epoch: u64,
        orchestrator: OrchestratorStatus,
        background: Vec<BackgroundWorkerState>,
        limits: ConcurrencyLimits,
    },
    HitlActionDone {
        issue: u64,
        result: Result<(), String>,
    },
}

// ---------------------------------------------------------------------------
// DashStore
// ---------------------------------------------------------------------------

/// The single owner of all reconciled dashboard state.
///
/// `apply` is synchronous and never awaits, so within the owning task a
/// half-applied update is unobservable. Presentation code only ever sees
/// [`DashSnapshot`] values and dispatches through the action methods.
pub struct DashStore {
    epoch: u64,
    connected: bool,
    buffer: EventBuffer,
    registry: WorkerRegistry,
    issues: PipelineIssues,
    prs: Vec<PullRequest>,
    background: BTreeMap<String, BackgroundWorkerState>,
    control: ControlState,
    limits: ConcurrencyLimits,
    sessions: Vec<PipelineSession>,
    selection: SessionSelection,
    hitl: HitlBacklog,
    cache: DeriveCache,
    transcript_tail: usize,
}

impl DashStore {
    pub fn new(buffer_capacity: usize, transcript_tail: usize) -> Self {
        Self {
            epoch: 0,
            connected: false,
            buffer: EventBuffer::new(buffer_capacity),
            registry: WorkerRegistry::new(),
            issues: PipelineIssues::default(),
            prs: Vec::new(),
            background: BTreeMap::new(),
            control: ControlState::new(),
            limits: ConcurrencyLimits::default(),
            sessions: Vec::new(),
            selection: SessionSelection::new(),
            hitl: HitlBacklog::new(),
            cache: DeriveCache::new(),
            transcript_tail,
        }
    }

    /// The current epoch; pollers stamp requests with it at issue time.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn hitl(&self) -> &HitlBacklog {
        &self.hitl
    }

    pub fn apply(&mut self, update: StoreUpdate) {
        match update {
            StoreUpdate::Connected => {
                self.connected = true;
            }
            StoreUpdate::Disconnected => {
                // Freeze, don't blank: derived state stays, but in-flight
                // poll completions from before the outage are now stale.
                self.connected = false;
                self.epoch += 1;
            }
            StoreUpdate::Event(event) => self.apply_event(event),
            StoreUpdate::Resync(snapshot) => self.apply_resync(snapshot),
            StoreUpdate::Issues { epoch, issues } => {
                if self.fresh(epoch) {
                    self.issues = issues;
                }
            }
            StoreUpdate::Prs { epoch, prs } => {
                if self.fresh(epoch) {
                    self.prs = prs;
                }
            }
            StoreUpdate::Hitl { epoch, result } => {
                if self.fresh(epoch) {
                    self.hitl.apply_fetch(result);
                }
            }
            StoreUpdate::Sessions { epoch, sessions } => {
                if self.fresh(epoch) {
                    self.sessions = sessions;
                }
            }
            StoreUpdate::ControlPlane {
                epoch,
                orchestrator,
                background,
                limits,
            } => {
                if self.fresh(epoch) {
                    self.background = background
                        .into_iter()
                        .map(|b| (b.name.clone(), b))
                        .collect();
                    self.limits = limits;
                    self.control
                        .observe(orchestrator, self.registry.active_total());
                }
            }
            StoreUpdate::HitlActionDone { issue, result } => {
                self.hitl.complete_action(issue, result);
            }
        }
    }

    fn fresh(&self, epoch: u64) -> bool {
        if epoch == self.epoch {
            true
        } else {
            tracing::debug!(got = epoch, current = self.epoch, "dropping stale poll result");
            false
        }
    }

    fn apply_event(&mut self, event: Event) {
        match event.kind {
            EventKind::BackgroundWorkerStatus => {
                match serde_json::from_value::<BackgroundWorkerState>(event.data.clone()) {
                    Ok(state) => {
                        self.background.insert(state.name.clone(), state);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed background status");
                    }
                }
            }
            _ => {
                if let Some(patch) = patch_from_event(&event) {
                    self.registry.apply_patch(&patch);
                    self.control
                        .on_workers_changed(self.registry.active_total());
                }
            }
        }
        self.buffer.push(event);
    }

    fn apply_resync(&mut self, snapshot: SnapshotPayload) {
        self.epoch += 1;
        let workers: Vec<Worker> = snapshot
            .workers
            .into_iter()
            .map(|w| w.into_worker())
            .collect();
        self.registry.resync(workers);
        self.background = snapshot
            .background
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();
        self.limits = snapshot.limits;
        self.control
            .observe(snapshot.orchestrator, self.registry.active_total());
        tracing::info!(workers = self.registry.len(), "full resynchronization applied");
    }

    // -- dispatch actions (called by the service before it performs I/O) --

    pub fn begin_hitl_fetch(&mut self) {
        self.hitl.begin_fetch();
    }

    pub fn begin_correct(&mut self, issue: u64, text: &str) -> Result<(), HitlError> {
        self.hitl.begin_correct(issue, text)
    }

    pub fn begin_skip(&mut self, issue: u64) -> Result<(), HitlError> {
        self.hitl.begin_skip(issue)
    }

    pub fn request_close(&mut self, issue: u64) -> Result<(), HitlError> {
        self.hitl.request_close(issue)
    }

    pub fn cancel_close(&mut self) {
        self.hitl.cancel_close();
    }

    pub fn begin_close(&mut self, issue: u64) -> Result<(), HitlError> {
        self.hitl.begin_close(issue)
    }

    // -- session selection (pure UI state) --

    pub fn toggle_repo_collapsed(&mut self, repo: &str) {
        self.selection.toggle_collapsed(repo);
    }

    pub fn select_session(&mut self, id: &str) {
        self.selection.select(id);
    }

    pub fn clear_session_selection(&mut self) {
        self.selection.clear();
    }

    /// Produce an immutable snapshot for presentation surfaces.
    pub fn snapshot(&mut self) -> DashSnapshot {
        let derived = self.cache.derive(
            &self.issues,
            &self.registry,
            &self.background,
            self.hitl.badge_count(),
        );
        let mut groups = group_by_repo(&self.sessions);
        for group in &mut groups {
            group.collapsed = self.selection.is_collapsed(&group.repo);
        }
        DashSnapshot {
            connected: self.connected,
            control: self.control.view(),
            orchestrator: self.control.reported(),
            limits: self.limits,
            derived,
            workers: self.registry.iter().cloned().collect(),
            feed: self.registry.combined_feed(self.transcript_tail),
            events: self.buffer.tail(EVENT_TAIL),
            issues: self.issues.clone(),
            prs: self.prs.clone(),
            hitl: HitlView {
                items: self.hitl.items().to_vec(),
                badge: self.hitl.badge_count(),
                loading: self.hitl.is_loading(),
                unknown: self.hitl.is_unknown(),
                confirm_close: self.hitl.close_awaiting_confirm(),
                errors: self.hitl.item_errors().clone(),
            },
            session_groups: groups,
            selected_session: self.selection.selected_id().map(String::from),
            issue_scope: self.selection.issue_scope(&self.sessions),
        }
    }
}

// ---------------------------------------------------------------------------
// DashSnapshot — what presentation surfaces consume
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HitlView {
    pub items: Vec<HitlItem>,
    pub badge: usize,
    pub loading: bool,
    pub unknown: bool,
    pub confirm_close: Option<u64>,
    /// Inline per-issue action errors; localized, never global.
    pub errors: BTreeMap<u64, String>,
}

#[derive(Debug, Clone)]
pub struct DashSnapshot {
    pub connected: bool,
    pub control: ControlView,
    pub orchestrator: OrchestratorStatus,
    pub limits: ConcurrencyLimits,
    pub derived: Arc<DerivedStatus>,
    pub workers: Vec<Worker>,
    pub feed: Vec<FeedGroup>,
    pub events: Vec<Event>,
    pub issues: PipelineIssues,
    pub prs: Vec<PullRequest>,
    pub hitl: HitlView,
    pub session_groups: Vec<RepoGroup>,
    pub selected_session: Option<String>,
    pub issue_scope: Option<Vec<u64>>,
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// EventKind / Event
// ---------------------------------------------------------------------------

/// The closed set of event types the orchestrator pushes over the socket.
///
/// Unknown kinds must fail to parse; the socket adapter drops them with a
/// warning instead of letting them reach the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WorkerUpdate,
    PhaseChange,
    PrCreated,
    ReviewUpdate,
    MergeUpdate,
    BatchStart,
    BatchComplete,
    Error,
    TranscriptLine,
    BackgroundWorkerStatus,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::WorkerUpdate => "worker_update",
            EventKind::PhaseChange => "phase_change",
            EventKind::PrCreated => "pr_created",
            EventKind::ReviewUpdate => "review_update",
            EventKind::MergeUpdate => "merge_update",
            EventKind::BatchStart => "batch_start",
            EventKind::BatchComplete => "batch_complete",
            EventKind::Error => "error",
            EventKind::TranscriptLine => "transcript_line",
            EventKind::BackgroundWorkerStatus => "background_worker_status",
        };
        write!(f, "{s}")
    }
}

/// One raw event as ingested from either transport. Immutable once appended
/// to the buffer; the `id` is assigned at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// StageRole
// ---------------------------------------------------------------------------

/// A pipeline stage that can have workers attached to it.
///
/// The `merged` bucket of the issue lists has no activity concept and is
/// deliberately not a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    Triage,
    Plan,
    Implement,
    Review,
}

impl StageRole {
    pub const ALL: &'static [StageRole] = &[
        StageRole::Triage,
        StageRole::Plan,
        StageRole::Implement,
        StageRole::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageRole::Triage => "triage",
            StageRole::Plan => "plan",
            StageRole::Implement => "implement",
            StageRole::Review => "review",
        }
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StageRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "triage" => Ok(StageRole::Triage),
            "plan" => Ok(StageRole::Plan),
            "implement" => Ok(StageRole::Implement),
            "review" => Ok(StageRole::Review),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerKey
// ---------------------------------------------------------------------------

/// The addressable unit of work in the registry.
///
/// Implement slots are keyed by the bare issue number; triage, plan and
/// review slots by `"<role>-<issue>"` so the same issue can occupy several
/// stages at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkerKey {
    Issue(u64),
    Role(StageRole, u64),
}

impl WorkerKey {
    /// Build a key from an issue number and an optional role.
    pub fn for_slot(issue: u64, role: Option<StageRole>) -> Self {
        match role {
            None | Some(StageRole::Implement) => WorkerKey::Issue(issue),
            Some(r) => WorkerKey::Role(r, issue),
        }
    }

    pub fn issue(&self) -> u64 {
        match self {
            WorkerKey::Issue(n) => *n,
            WorkerKey::Role(_, n) => *n,
        }
    }

    pub fn role(&self) -> StageRole {
        match self {
            WorkerKey::Issue(_) => StageRole::Implement,
            WorkerKey::Role(r, _) => *r,
        }
    }
}

impl fmt::Display for WorkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKey::Issue(n) => write!(f, "{n}"),
            WorkerKey::Role(r, n) => write!(f, "{r}-{n}"),
        }
    }
}

impl FromStr for WorkerKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u64>() {
            return Ok(WorkerKey::Issue(n));
        }
        let (role, issue) = s.rsplit_once('-').ok_or(())?;
        let role: StageRole = role.parse()?;
        if role == StageRole::Implement {
            return Err(());
        }
        let issue: u64 = issue.parse().map_err(|_| ())?;
        Ok(WorkerKey::Role(role, issue))
    }
}

// ---------------------------------------------------------------------------
// WorkerStatus
// ---------------------------------------------------------------------------

/// Worker lifecycle status as reported by the orchestrator.
///
/// The enum is closed on purpose: a status string the backend adds later
/// fails to parse and the update is dropped loudly, rather than being
/// misclassified as inactive and silently hiding work in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Queued,
    Evaluating,
    Planning,
    Running,
    Testing,
    Committing,
    Start,
    MergeMain,
    MergeFix,
    CiWait,
    CiFix,
    Merging,
    Validating,
    Retrying,
    Fixing,
    QualityFix,
    Reviewing,
    Done,
    Failed,
}

impl WorkerStatus {
    /// The maintained set of statuses that count as "actively working".
    ///
    /// Everything non-terminal except `queued`. Consumed everywhere a count
    /// of active workers is needed; never re-derive this at a call site.
    pub const ACTIVE: &'static [WorkerStatus] = &[
        WorkerStatus::Evaluating,
        WorkerStatus::Planning,
        WorkerStatus::Running,
        WorkerStatus::Testing,
        WorkerStatus::Committing,
        WorkerStatus::Start,
        WorkerStatus::MergeMain,
        WorkerStatus::MergeFix,
        WorkerStatus::CiWait,
        WorkerStatus::CiFix,
        WorkerStatus::Merging,
        WorkerStatus::Validating,
        WorkerStatus::Retrying,
        WorkerStatus::Fixing,
        WorkerStatus::QualityFix,
        WorkerStatus::Reviewing,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerStatus::Done | WorkerStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Queued => "queued",
            WorkerStatus::Evaluating => "evaluating",
            WorkerStatus::Planning => "planning",
            WorkerStatus::Running => "running",
            WorkerStatus::Testing => "testing",
            WorkerStatus::Committing => "committing",
            WorkerStatus::Start => "start",
            WorkerStatus::MergeMain => "merge_main",
            WorkerStatus::MergeFix => "merge_fix",
            WorkerStatus::CiWait => "ci_wait",
            WorkerStatus::CiFix => "ci_fix",
            WorkerStatus::Merging => "merging",
            WorkerStatus::Validating => "validating",
            WorkerStatus::Retrying => "retrying",
            WorkerStatus::Fixing => "fixing",
            WorkerStatus::QualityFix => "quality_fix",
            WorkerStatus::Reviewing => "reviewing",
            WorkerStatus::Done => "done",
            WorkerStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Current state of one worker slot.
///
/// Created on first reference from either transport; evicted only by a full
/// resynchronization, never piecemeal.
#[derive(Debug, Clone)]
pub struct Worker {
    pub key: WorkerKey,
    pub role: StageRole,
    pub status: WorkerStatus,
    pub title: Option<String>,
    pub branch: Option<String>,
    pub pr: Option<u64>,
    pub transcript: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    pub fn new(key: WorkerKey) -> Self {
        Self {
            key,
            role: key.role(),
            status: WorkerStatus::Queued,
            title: None,
            branch: None,
            pr: None,
            transcript: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerPatch — partial update from either transport
// ---------------------------------------------------------------------------

/// A field-wise worker update. Every field is optional so a delayed partial
/// event cannot erase a newer field written by the other source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerPatch {
    pub issue: u64,
    #[serde(default)]
    pub role: Option<StageRole>,
    #[serde(default)]
    pub status: Option<WorkerStatus>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub pr: Option<u64>,
    #[serde(default)]
    pub line: Option<String>,
}

impl WorkerPatch {
    pub fn key(&self) -> WorkerKey {
        WorkerKey::for_slot(self.issue, self.role)
    }
}

// ---------------------------------------------------------------------------
// WorkerWire — full record shape used in socket snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerWire {
    pub issue: u64,
    #[serde(default)]
    pub role: Option<StageRole>,
    pub status: WorkerStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub pr: Option<u64>,
    #[serde(default)]
    pub transcript: Vec<String>,
}

impl WorkerWire {
    pub fn into_worker(self) -> Worker {
        let key = WorkerKey::for_slot(self.issue, self.role);
        Worker {
            key,
            role: key.role(),
            status: self.status,
            title: self.title,
            branch: self.branch,
            pr: self.pr,
            transcript: self.transcript,
            updated_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineIssue / PipelineIssues
// ---------------------------------------------------------------------------

/// One tracked issue inside a stage bucket, sourced from REST snapshots.
/// Authoritative for "what exists in this stage"; the worker registry is
/// authoritative for "is something working on it right now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineIssue {
    pub issue_number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
}

/// The per-stage issue buckets from `GET /api/issues`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineIssues {
    #[serde(default)]
    pub triage: Vec<PipelineIssue>,
    #[serde(default)]
    pub plan: Vec<PipelineIssue>,
    #[serde(default)]
    pub implement: Vec<PipelineIssue>,
    #[serde(default)]
    pub review: Vec<PipelineIssue>,
    #[serde(default)]
    pub merged: Vec<PipelineIssue>,
}

impl PipelineIssues {
    pub fn bucket(&self, role: StageRole) -> &[PipelineIssue] {
        match role {
            StageRole::Triage => &self.triage,
            StageRole::Plan => &self.plan,
            StageRole::Implement => &self.implement,
            StageRole::Review => &self.review,
        }
    }
}

// ---------------------------------------------------------------------------
// PullRequest
// ---------------------------------------------------------------------------

/// One open pull request from `GET /api/prs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Background loops
// ---------------------------------------------------------------------------

/// System maintenance loops that must prove liveness: absent any report they
/// classify as stopped, unlike the pipeline-stage loops which are assumed on.
pub const SYSTEM_LOOPS: &[&str] = &[
    "pipeline_poller",
    "memory_sync",
    "metrics",
    "retrospective",
    "review_insights",
];

pub fn is_system_loop(name: &str) -> bool {
    SYSTEM_LOOPS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopHealth {
    Ok,
    Error,
    Disabled,
}

/// Reported state of one named background loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundWorkerState {
    pub name: String,
    pub status: LoopHealth,
    pub enabled: bool,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: serde_json::Value,
}

// ---------------------------------------------------------------------------
// StageStatus (derived)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageColor {
    Green,
    Yellow,
    Red,
}

impl StageColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageColor::Green => "green",
            StageColor::Yellow => "yellow",
            StageColor::Red => "red",
        }
    }
}

/// Derived health classification for one stage or loop. Never stored; always
/// recomputed from the current inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageStatus {
    pub enabled: bool,
    pub active_workers: usize,
    pub color: StageColor,
}

// ---------------------------------------------------------------------------
// HITL
// ---------------------------------------------------------------------------

/// One item in the human-in-the-loop escalation backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitlItem {
    pub issue: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pr: Option<u64>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A historical pipeline run. Read-only from the dashboard's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSession {
    pub id: String,
    #[serde(default)]
    pub repo: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issues_processed: Vec<u64>,
    #[serde(default)]
    pub issues_succeeded: u32,
    #[serde(default)]
    pub issues_failed: u32,
    #[serde(default)]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Orchestrator control plane
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorStatus {
    Idle,
    Running,
    Stopping,
    CreditsPaused,
    Done,
}

impl fmt::Display for OrchestratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrchestratorStatus::Idle => "idle",
            OrchestratorStatus::Running => "running",
            OrchestratorStatus::Stopping => "stopping",
            OrchestratorStatus::CreditsPaused => "credits_paused",
            OrchestratorStatus::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Pipeline concurrency limits surfaced read-only from the control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyLimits {
    #[serde(default)]
    pub max_planners: u32,
    #[serde(default)]
    pub max_workers: u32,
    #[serde(default)]
    pub max_reviewers: u32,
}

// ---------------------------------------------------------------------------
// Socket snapshot payload
// ---------------------------------------------------------------------------

/// Full state sent by the backend in reply to a `snapshot_request`. Replaces
/// the registry wholesale; events missed during an outage are not replayed.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPayload {
    #[serde(default)]
    pub workers: Vec<WorkerWire>,
    #[serde(default)]
    pub background: Vec<BackgroundWorkerState>,
    pub orchestrator: OrchestratorStatus,
    #[serde(default)]
    pub limits: ConcurrencyLimits,
}

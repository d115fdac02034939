use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use od_core::types::{
    BackgroundWorkerState, LoopHealth, PipelineIssues, StageColor, StageRole, StageStatus,
    SYSTEM_LOOPS,
};

use crate::registry::WorkerRegistry;

/// The derived health picture consumed by every presentation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStatus {
    /// Per pipeline stage. `merged` has no activity concept and is absent.
    pub stages: BTreeMap<StageRole, StageStatus>,
    /// Background loops by name (system loops plus any reported non-stage
    /// loop). Unreported system loops appear here as stopped.
    pub loops: BTreeMap<String, StageStatus>,
    /// Issue-bucket depth per stage, for queue badges.
    pub stage_depth: BTreeMap<StageRole, usize>,
    /// Items waiting on a human.
    pub hitl_waiting: usize,
}

/// Classify every stage and loop from the current inputs.
///
/// Pure: same inputs, same output, no hidden state. Stage color follows the
/// StageStatus invariant — red iff explicitly disabled, green iff enabled
/// with active workers, yellow iff enabled and idle. System loops must prove
/// liveness: absent any report they classify as stopped, while stage loops
/// are assumed enabled until told otherwise.
pub fn derive_stage_status(
    issues: &PipelineIssues,
    registry: &WorkerRegistry,
    background: &BTreeMap<String, BackgroundWorkerState>,
    hitl_waiting: usize,
) -> DerivedStatus {
    let mut stages = BTreeMap::new();
    let mut stage_depth = BTreeMap::new();

    for role in StageRole::ALL {
        let enabled = background
            .get(role.as_str())
            .map(loop_is_enabled)
            .unwrap_or(true);
        let active_workers = registry.active_count(*role);
        let color = if !enabled {
            StageColor::Red
        } else if active_workers > 0 {
            StageColor::Green
        } else {
            StageColor::Yellow
        };
        stages.insert(
            *role,
            StageStatus {
                enabled,
                active_workers,
                color,
            },
        );
        stage_depth.insert(*role, issues.bucket(*role).len());
    }

    let mut loops = BTreeMap::new();
    for name in SYSTEM_LOOPS {
        let status = match background.get(*name) {
            None => StageStatus {
                enabled: false,
                active_workers: 0,
                color: StageColor::Red,
            },
            Some(state) => classify_loop(state),
        };
        loops.insert((*name).to_string(), status);
    }
    // Reported loops outside the stage/system vocabulary still get a badge.
    for (name, state) in background {
        if StageRole::ALL.iter().any(|r| r.as_str() == name) || loops.contains_key(name) {
            continue;
        }
        loops.insert(name.clone(), classify_loop(state));
    }

    DerivedStatus {
        stages,
        loops,
        stage_depth,
        hitl_waiting,
    }
}

fn loop_is_enabled(state: &BackgroundWorkerState) -> bool {
    state.enabled && state.status != LoopHealth::Disabled
}

fn classify_loop(state: &BackgroundWorkerState) -> StageStatus {
    let enabled = loop_is_enabled(state);
    let color = if !enabled {
        StageColor::Red
    } else {
        match state.status {
            LoopHealth::Ok => StageColor::Green,
            // A loop that reports errors is not stopped, but it is not
            // healthy either; surface it at the highest severity.
            LoopHealth::Error => StageColor::Red,
            LoopHealth::Disabled => StageColor::Red,
        }
    };
    StageStatus {
        enabled,
        active_workers: 0,
        color,
    }
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

/// Caches the last derivation behind a structural fingerprint of the inputs,
/// so equal inputs return the same `Arc` and dependent views can skip work.
#[derive(Debug, Default)]
pub struct DeriveCache {
    last: Option<(u64, Arc<DerivedStatus>)>,
}

impl DeriveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(
        &mut self,
        issues: &PipelineIssues,
        registry: &WorkerRegistry,
        background: &BTreeMap<String, BackgroundWorkerState>,
        hitl_waiting: usize,
    ) -> Arc<DerivedStatus> {
        let fp = fingerprint(issues, registry, background, hitl_waiting);
        if let Some((hash, cached)) = &self.last {
            if *hash == fp {
                return Arc::clone(cached);
            }
        }
        let derived = Arc::new(derive_stage_status(issues, registry, background, hitl_waiting));
        self.last = Some((fp, Arc::clone(&derived)));
        derived
    }
}

/// Structural hash over exactly the inputs the derivation reads.
fn fingerprint(
    issues: &PipelineIssues,
    registry: &WorkerRegistry,
    background: &BTreeMap<String, BackgroundWorkerState>,
    hitl_waiting: usize,
) -> u64 {
    let mut h = ahash::AHasher::default();
    for worker in registry.iter() {
        worker.key.hash(&mut h);
        worker.status.hash(&mut h);
    }
    0xb5u8.hash(&mut h);
    for (name, state) in background {
        name.hash(&mut h);
        state.enabled.hash(&mut h);
        state.status.hash(&mut h);
    }
    0xb6u8.hash(&mut h);
    for role in StageRole::ALL {
        for issue in issues.bucket(*role) {
            issue.issue_number.hash(&mut h);
        }
        0xb7u8.hash(&mut h);
    }
    hitl_waiting.hash(&mut h);
    h.finish()
}

use std::collections::BTreeMap;

use chrono::Utc;
use od_core::types::{Event, EventKind, StageRole, Worker, WorkerKey, WorkerPatch};

/// Keyed map of worker-slot → current worker state, fed by both transports.
///
/// Updates are applied last-writer-wins **per field**: a delayed event that
/// only carries a status can never erase a title or branch written by a newer
/// update from the other source. Slots are evicted only by a full
/// resynchronization.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<WorkerKey, Worker>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &WorkerKey) -> Option<&Worker> {
        self.workers.get(key)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// All workers in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    /// Apply a field-wise update, creating the slot on first reference.
    ///
    /// A non-terminal status arriving on a slot that already finished means a
    /// new run has started there: the slot is reset before the patch lands.
    pub fn apply_patch(&mut self, patch: &WorkerPatch) {
        let key = patch.key();
        let worker = self
            .workers
            .entry(key)
            .or_insert_with(|| Worker::new(key));

        if let Some(status) = patch.status {
            if worker.status.is_terminal() && !status.is_terminal() {
                *worker = Worker::new(key);
            }
        }

        if let Some(status) = patch.status {
            worker.status = status;
        }
        if let Some(title) = &patch.title {
            worker.title = Some(title.clone());
        }
        if let Some(branch) = &patch.branch {
            worker.branch = Some(branch.clone());
        }
        if let Some(pr) = patch.pr {
            worker.pr = Some(pr);
        }
        if let Some(line) = &patch.line {
            worker.transcript.push(line.clone());
        }
        worker.updated_at = Utc::now();
    }

    /// Replace the whole map from a full snapshot. The only path that ever
    /// removes a slot.
    pub fn resync(&mut self, workers: impl IntoIterator<Item = Worker>) {
        self.workers = workers.into_iter().map(|w| (w.key, w)).collect();
    }

    /// Count of workers in `role` whose status is in the active set.
    pub fn active_count(&self, role: StageRole) -> usize {
        self.workers
            .values()
            .filter(|w| w.role == role && w.status.is_active())
            .count()
    }

    /// Total active workers across all roles. Drives the hold-timer.
    pub fn active_total(&self) -> usize {
        self.workers
            .values()
            .filter(|w| w.status.is_active())
            .count()
    }

    /// The combined transcript feed: a capped tail per active worker, grouped
    /// by the role+issue slot key, in key order.
    pub fn combined_feed(&self, tail: usize) -> Vec<FeedGroup> {
        self.workers
            .values()
            .filter(|w| w.status.is_active() && !w.transcript.is_empty())
            .map(|w| {
                let skip = w.transcript.len().saturating_sub(tail);
                FeedGroup {
                    key: w.key,
                    label: w.key.to_string(),
                    lines: w.transcript[skip..].to_vec(),
                }
            })
            .collect()
    }
}

/// One group of the combined feed: the tail of a single active worker's
/// transcript under its slot label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedGroup {
    pub key: WorkerKey,
    pub label: String,
    pub lines: Vec<String>,
}

/// Extract a registry patch from a socket event, if the kind carries one.
///
/// Malformed payloads degrade to `None` with a warning; they must neither
/// throw nor corrupt the registry.
pub fn patch_from_event(event: &Event) -> Option<WorkerPatch> {
    let parsed = match event.kind {
        EventKind::WorkerUpdate | EventKind::TranscriptLine => {
            serde_json::from_value::<WorkerPatch>(event.data.clone())
        }
        EventKind::PrCreated => serde_json::from_value::<WorkerPatch>(event.data.clone()),
        _ => return None,
    };
    match parsed {
        Ok(patch) => Some(patch),
        Err(e) => {
            tracing::warn!(kind = %event.kind, error = %e, "dropping malformed event payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use od_core::types::WorkerStatus;

    fn patch(issue: u64) -> WorkerPatch {
        WorkerPatch {
            issue,
            ..Default::default()
        }
    }

    #[test]
    fn creates_slot_on_first_reference() {
        let mut reg = WorkerRegistry::new();
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Running),
            ..patch(5)
        });
        let w = reg.get(&WorkerKey::Issue(5)).unwrap();
        assert_eq!(w.status, WorkerStatus::Running);
        assert_eq!(w.role, StageRole::Implement);
    }

    #[test]
    fn partial_patch_does_not_erase_other_fields() {
        let mut reg = WorkerRegistry::new();
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Running),
            title: Some("Add retry logic".into()),
            branch: Some("pipeline/5".into()),
            ..patch(5)
        });
        // A delayed event carrying only a status.
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Testing),
            ..patch(5)
        });
        let w = reg.get(&WorkerKey::Issue(5)).unwrap();
        assert_eq!(w.status, WorkerStatus::Testing);
        assert_eq!(w.title.as_deref(), Some("Add retry logic"));
        assert_eq!(w.branch.as_deref(), Some("pipeline/5"));
    }

    #[test]
    fn duplicate_patches_are_idempotent() {
        let mut reg = WorkerRegistry::new();
        let p = WorkerPatch {
            status: Some(WorkerStatus::Running),
            title: Some("t".into()),
            ..patch(9)
        };
        reg.apply_patch(&p);
        reg.apply_patch(&p);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.active_count(StageRole::Implement), 1);
    }

    #[test]
    fn terminal_slot_resets_on_new_run() {
        let mut reg = WorkerRegistry::new();
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Done),
            title: Some("old run".into()),
            line: Some("finished".into()),
            ..patch(7)
        });
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Queued),
            ..patch(7)
        });
        let w = reg.get(&WorkerKey::Issue(7)).unwrap();
        assert_eq!(w.status, WorkerStatus::Queued);
        assert!(w.title.is_none(), "new run starts from a clean slot");
        assert!(w.transcript.is_empty());
    }

    #[test]
    fn terminal_to_terminal_does_not_reset() {
        let mut reg = WorkerRegistry::new();
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Done),
            title: Some("kept".into()),
            ..patch(7)
        });
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Failed),
            ..patch(7)
        });
        let w = reg.get(&WorkerKey::Issue(7)).unwrap();
        assert_eq!(w.status, WorkerStatus::Failed);
        assert_eq!(w.title.as_deref(), Some("kept"));
    }

    #[test]
    fn role_slots_are_distinct_from_implement_slots() {
        let mut reg = WorkerRegistry::new();
        reg.apply_patch(&WorkerPatch {
            role: Some(StageRole::Triage),
            status: Some(WorkerStatus::Evaluating),
            ..patch(5)
        });
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Running),
            ..patch(5)
        });
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.active_count(StageRole::Triage), 1);
        assert_eq!(reg.active_count(StageRole::Implement), 1);
    }

    #[test]
    fn queued_and_terminal_do_not_count_as_active() {
        let mut reg = WorkerRegistry::new();
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Queued),
            ..patch(1)
        });
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Done),
            ..patch(2)
        });
        assert_eq!(reg.active_total(), 0);
    }

    #[test]
    fn transcript_lines_append_in_order() {
        let mut reg = WorkerRegistry::new();
        for i in 0..3 {
            reg.apply_patch(&WorkerPatch {
                status: Some(WorkerStatus::Running),
                line: Some(format!("line {i}")),
                ..patch(4)
            });
        }
        let w = reg.get(&WorkerKey::Issue(4)).unwrap();
        assert_eq!(w.transcript, vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn combined_feed_caps_tail_and_skips_idle() {
        let mut reg = WorkerRegistry::new();
        for i in 0..5 {
            reg.apply_patch(&WorkerPatch {
                status: Some(WorkerStatus::Running),
                line: Some(format!("l{i}")),
                ..patch(3)
            });
        }
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Done),
            line: Some("done".into()),
            ..patch(8)
        });

        let feed = reg.combined_feed(2);
        assert_eq!(feed.len(), 1, "terminal workers are not in the feed");
        assert_eq!(feed[0].label, "3");
        assert_eq!(feed[0].lines, vec!["l3", "l4"]);
    }

    #[test]
    fn resync_evicts_stale_slots() {
        let mut reg = WorkerRegistry::new();
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Running),
            ..patch(1)
        });
        reg.apply_patch(&WorkerPatch {
            status: Some(WorkerStatus::Running),
            ..patch(2)
        });
        reg.resync(vec![Worker::new(WorkerKey::Issue(2))]);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(&WorkerKey::Issue(1)).is_none());
    }

    #[test]
    fn patch_from_event_ignores_feed_only_kinds() {
        let ev = Event::new(
            EventKind::BatchStart,
            Utc::now(),
            serde_json::json!({"batch": 1}),
        );
        assert!(patch_from_event(&ev).is_none());
    }

    #[test]
    fn patch_from_event_drops_malformed_payload() {
        let ev = Event::new(
            EventKind::WorkerUpdate,
            Utc::now(),
            serde_json::json!({"status": "running"}), // missing issue
        );
        assert!(patch_from_event(&ev).is_none());
    }

    #[test]
    fn patch_from_event_parses_worker_update() {
        let ev = Event::new(
            EventKind::WorkerUpdate,
            Utc::now(),
            serde_json::json!({"issue": 5, "status": "quality_fix"}),
        );
        let p = patch_from_event(&ev).unwrap();
        assert_eq!(p.status, Some(WorkerStatus::QualityFix));
    }
}

use od_core::types::OrchestratorStatus;

/// What the control surface should display right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlView {
    Stable(OrchestratorStatus),
    /// A stop was requested but in-flight workers have not drained yet.
    Holding,
}

impl ControlView {
    pub fn label(&self) -> &'static str {
        match self {
            ControlView::Holding => "Stopping…",
            ControlView::Stable(OrchestratorStatus::Idle) => "Idle",
            ControlView::Stable(OrchestratorStatus::Running) => "Running",
            ControlView::Stable(OrchestratorStatus::Stopping) => "Stopping…",
            ControlView::Stable(OrchestratorStatus::CreditsPaused) => "Credits paused",
            ControlView::Stable(OrchestratorStatus::Done) => "Done",
        }
    }
}

/// Smooths the control plane's run/stop signal against worker-registry lag.
///
/// The orchestrator reports `stopping` and then `idle` while drained workers
/// are still winding down; reflecting that directly makes the Start/Stop
/// control flicker. The hold exits on actual work completion, never on a
/// timer: once a stop is observed, the view stays `Holding` until the active
/// worker count reaches zero (or the status flaps back to `running`).
#[derive(Debug)]
pub struct ControlState {
    reported: OrchestratorStatus,
    view: ControlView,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            reported: OrchestratorStatus::Idle,
            view: ControlView::Stable(OrchestratorStatus::Idle),
        }
    }

    /// The last status the control plane reported, unsmoothed.
    pub fn reported(&self) -> OrchestratorStatus {
        self.reported
    }

    pub fn view(&self) -> ControlView {
        self.view
    }

    /// Feed a control-plane status report plus the current active count.
    pub fn observe(&mut self, status: OrchestratorStatus, active_workers: usize) {
        self.reported = status;
        self.view = match status {
            OrchestratorStatus::Stopping => ControlView::Holding,
            // A flap back to running exits the hold immediately.
            OrchestratorStatus::Running => ControlView::Stable(OrchestratorStatus::Running),
            // Credits exhaustion is displayed as-is, independent of the hold.
            OrchestratorStatus::CreditsPaused => {
                ControlView::Stable(OrchestratorStatus::CreditsPaused)
            }
            OrchestratorStatus::Idle | OrchestratorStatus::Done => {
                if self.view == ControlView::Holding && active_workers > 0 {
                    ControlView::Holding
                } else {
                    ControlView::Stable(status)
                }
            }
        };
    }

    /// Re-evaluate the hold on a worker-registry change. No-op outside a hold.
    pub fn on_workers_changed(&mut self, active_workers: usize) {
        if self.view == ControlView::Holding
            && active_workers == 0
            && matches!(
                self.reported,
                OrchestratorStatus::Idle | OrchestratorStatus::Done
            )
        {
            self.view = ControlView::Stable(OrchestratorStatus::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_with_live_worker_holds_until_drain() {
        let mut c = ControlState::new();
        c.observe(OrchestratorStatus::Running, 1);
        c.observe(OrchestratorStatus::Stopping, 1);
        assert_eq!(c.view(), ControlView::Holding);

        // The control plane already says idle, but one worker is still live.
        c.observe(OrchestratorStatus::Idle, 1);
        assert_eq!(c.view(), ControlView::Holding);
        assert_eq!(c.view().label(), "Stopping…");

        // Registry updates while the worker is still running: hold persists.
        c.on_workers_changed(1);
        assert_eq!(c.view(), ControlView::Holding);

        // Worker reaches a terminal status; the very next cycle shows Idle.
        c.on_workers_changed(0);
        assert_eq!(c.view(), ControlView::Stable(OrchestratorStatus::Idle));
    }

    #[test]
    fn status_flap_back_to_running_exits_hold_immediately() {
        let mut c = ControlState::new();
        c.observe(OrchestratorStatus::Running, 3);
        c.observe(OrchestratorStatus::Stopping, 3);
        assert_eq!(c.view(), ControlView::Holding);

        c.observe(OrchestratorStatus::Running, 3);
        assert_eq!(c.view(), ControlView::Stable(OrchestratorStatus::Running));
    }

    #[test]
    fn idle_report_with_no_workers_exits_hold() {
        let mut c = ControlState::new();
        c.observe(OrchestratorStatus::Stopping, 2);
        c.observe(OrchestratorStatus::Idle, 0);
        assert_eq!(c.view(), ControlView::Stable(OrchestratorStatus::Idle));
    }

    #[test]
    fn done_drains_to_idle_display() {
        let mut c = ControlState::new();
        c.observe(OrchestratorStatus::Stopping, 1);
        c.observe(OrchestratorStatus::Done, 1);
        assert_eq!(c.view(), ControlView::Holding);
        c.on_workers_changed(0);
        assert_eq!(c.view(), ControlView::Stable(OrchestratorStatus::Idle));
    }

    #[test]
    fn credits_paused_bypasses_hold() {
        let mut c = ControlState::new();
        c.observe(OrchestratorStatus::Stopping, 4);
        assert_eq!(c.view(), ControlView::Holding);
        c.observe(OrchestratorStatus::CreditsPaused, 4);
        assert_eq!(
            c.view(),
            ControlView::Stable(OrchestratorStatus::CreditsPaused)
        );
        assert_eq!(c.view().label(), "Credits paused");
    }

    #[test]
    fn idle_without_a_hold_displays_directly() {
        let mut c = ControlState::new();
        c.observe(OrchestratorStatus::Idle, 0);
        assert_eq!(c.view(), ControlView::Stable(OrchestratorStatus::Idle));
        c.observe(OrchestratorStatus::Done, 0);
        assert_eq!(c.view(), ControlView::Stable(OrchestratorStatus::Done));
    }

    #[test]
    fn workers_draining_without_stop_report_does_not_fabricate_idle() {
        let mut c = ControlState::new();
        c.observe(OrchestratorStatus::Running, 2);
        c.on_workers_changed(0);
        assert_eq!(c.view(), ControlView::Stable(OrchestratorStatus::Running));
    }
}

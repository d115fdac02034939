use std::collections::BTreeMap;

use od_core::types::HitlItem;

/// The three terminal actions on an escalated item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitlAction {
    Correct,
    Skip,
    Close,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HitlError {
    #[error("correction text is empty")]
    EmptyCorrection,
    #[error("close requires confirmation")]
    CloseNotConfirmed,
    #[error("an action is already in flight for issue {0}")]
    ActionInFlight(u64),
    #[error("issue {0} is not in the backlog")]
    UnknownIssue(u64),
}

/// The escalation backlog and its action lifecycle.
///
/// The backlog is server-authoritative: items appear when a GET returns them
/// and disappear only after a successful POST **and** a refetch that no
/// longer lists them. Nothing is removed optimistically — a correction may
/// fail validation server-side and the item must stay visible.
#[derive(Debug, Default)]
pub struct HitlBacklog {
    items: Vec<HitlItem>,
    loading: bool,
    fetched_once: bool,
    fetch_error: Option<String>,
    pending: Option<(u64, HitlAction)>,
    confirm_close: Option<u64>,
    item_errors: BTreeMap<u64, String>,
}

impl HitlBacklog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[HitlItem] {
        &self.items
    }

    /// Count for dependent badges. A failed refresh reports 0 rather than
    /// propagating an error; `is_unknown` tells the two apart.
    pub fn badge_count(&self) -> usize {
        if self.fetch_error.is_some() {
            0
        } else {
            self.items.len()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True when the count cannot be trusted: never fetched, or last fetch
    /// failed.
    pub fn is_unknown(&self) -> bool {
        !self.fetched_once || self.fetch_error.is_some()
    }

    pub fn pending(&self) -> Option<(u64, HitlAction)> {
        self.pending
    }

    pub fn item_error(&self, issue: u64) -> Option<&str> {
        self.item_errors.get(&issue).map(String::as_str)
    }

    pub fn item_errors(&self) -> &BTreeMap<u64, String> {
        &self.item_errors
    }

    pub fn close_awaiting_confirm(&self) -> Option<u64> {
        self.confirm_close
    }

    // -- fetch lifecycle --

    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    pub fn apply_fetch(&mut self, result: Result<Vec<HitlItem>, String>) {
        self.loading = false;
        match result {
            Ok(items) => {
                self.fetched_once = true;
                self.fetch_error = None;
                self.item_errors
                    .retain(|issue, _| items.iter().any(|i| i.issue == *issue));
                if let Some(confirm) = self.confirm_close {
                    if !items.iter().any(|i| i.issue == confirm) {
                        self.confirm_close = None;
                    }
                }
                self.items = items;
            }
            Err(e) => {
                tracing::warn!(error = %e, "hitl refresh failed");
                self.fetch_error = Some(e);
            }
        }
    }

    // -- action lifecycle --

    /// Client-side guard: an empty correction never reaches the server.
    pub fn validate_correction(text: &str) -> Result<(), HitlError> {
        if text.trim().is_empty() {
            Err(HitlError::EmptyCorrection)
        } else {
            Ok(())
        }
    }

    pub fn begin_correct(&mut self, issue: u64, text: &str) -> Result<(), HitlError> {
        Self::validate_correction(text)?;
        self.begin(issue, HitlAction::Correct)
    }

    pub fn begin_skip(&mut self, issue: u64) -> Result<(), HitlError> {
        self.begin(issue, HitlAction::Skip)
    }

    /// First step of the two-step close: arm the confirmation.
    pub fn request_close(&mut self, issue: u64) -> Result<(), HitlError> {
        self.ensure_known(issue)?;
        self.confirm_close = Some(issue);
        Ok(())
    }

    pub fn cancel_close(&mut self) {
        self.confirm_close = None;
    }

    /// Second step: only issues the user explicitly confirmed may close.
    pub fn begin_close(&mut self, issue: u64) -> Result<(), HitlError> {
        if self.confirm_close != Some(issue) {
            return Err(HitlError::CloseNotConfirmed);
        }
        self.begin(issue, HitlAction::Close)?;
        self.confirm_close = None;
        Ok(())
    }

    /// Record the outcome of the POST. Success does not remove the item —
    /// removal is the refetch's job. Failure pins an inline error on the
    /// item and leaves its editing panel open.
    pub fn complete_action(&mut self, issue: u64, result: Result<(), String>) {
        if self.pending.map(|(i, _)| i) == Some(issue) {
            self.pending = None;
        }
        match result {
            Ok(()) => {
                self.item_errors.remove(&issue);
            }
            Err(e) => {
                self.item_errors.insert(issue, e);
            }
        }
    }

    fn begin(&mut self, issue: u64, action: HitlAction) -> Result<(), HitlError> {
        self.ensure_known(issue)?;
        if let Some((pending, _)) = self.pending {
            return Err(HitlError::ActionInFlight(pending));
        }
        self.pending = Some((issue, action));
        Ok(())
    }

    fn ensure_known(&self, issue: u64) -> Result<(), HitlError> {
        if self.items.iter().any(|i| i.issue == issue) {
            Ok(())
        } else {
            Err(HitlError::UnknownIssue(issue))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(issue: u64) -> HitlItem {
        HitlItem {
            issue,
            title: format!("issue {issue}"),
            pr: None,
            branch: None,
            cause: "review loop exhausted".into(),
            status: "waiting".into(),
        }
    }

    fn backlog_with(issues: &[u64]) -> HitlBacklog {
        let mut b = HitlBacklog::new();
        b.begin_fetch();
        b.apply_fetch(Ok(issues.iter().copied().map(item).collect()));
        b
    }

    #[test]
    fn empty_correction_is_rejected_before_any_post() {
        let mut b = backlog_with(&[42]);
        let err = b.begin_correct(42, "").unwrap_err();
        assert_eq!(err, HitlError::EmptyCorrection);
        let err = b.begin_correct(42, "   \n").unwrap_err();
        assert_eq!(err, HitlError::EmptyCorrection);
        assert_eq!(b.pending(), None, "no POST may be issued");
    }

    #[test]
    fn skip_removes_only_after_refetch_without_item() {
        let mut b = backlog_with(&[10, 11]);
        b.begin_skip(10).unwrap();
        assert_eq!(b.pending(), Some((10, HitlAction::Skip)));

        b.complete_action(10, Ok(()));
        assert_eq!(b.pending(), None);
        // POST succeeded but the backlog still shows the item.
        assert_eq!(b.badge_count(), 2);

        // Server lag: the refetch still includes issue 10 -> stays visible.
        b.apply_fetch(Ok(vec![item(10), item(11)]));
        assert!(b.items().iter().any(|i| i.issue == 10));

        // A later refetch without it finally removes it.
        b.apply_fetch(Ok(vec![item(11)]));
        assert!(!b.items().iter().any(|i| i.issue == 10));
        assert_eq!(b.badge_count(), 1);
    }

    #[test]
    fn close_requires_explicit_confirmation() {
        let mut b = backlog_with(&[7]);
        assert_eq!(b.begin_close(7).unwrap_err(), HitlError::CloseNotConfirmed);

        b.request_close(7).unwrap();
        assert_eq!(b.close_awaiting_confirm(), Some(7));
        b.begin_close(7).unwrap();
        assert_eq!(b.pending(), Some((7, HitlAction::Close)));
        assert_eq!(b.close_awaiting_confirm(), None);
    }

    #[test]
    fn cancel_close_disarms_confirmation() {
        let mut b = backlog_with(&[7]);
        b.request_close(7).unwrap();
        b.cancel_close();
        assert_eq!(b.begin_close(7).unwrap_err(), HitlError::CloseNotConfirmed);
    }

    #[test]
    fn failed_post_keeps_item_and_pins_inline_error() {
        let mut b = backlog_with(&[5]);
        b.begin_correct(5, "rebase onto main first").unwrap();
        b.complete_action(5, Err("422: correction rejected".into()));

        assert!(b.items().iter().any(|i| i.issue == 5));
        assert_eq!(b.item_error(5), Some("422: correction rejected"));
        assert_eq!(b.pending(), None, "the action slot is free for a retry");

        // A retry that succeeds clears the inline error.
        b.begin_correct(5, "rebase onto main first").unwrap();
        b.complete_action(5, Ok(()));
        assert_eq!(b.item_error(5), None);
    }

    #[test]
    fn failed_refresh_reports_zero_but_unknown() {
        let mut b = backlog_with(&[1, 2, 3]);
        assert_eq!(b.badge_count(), 3);
        assert!(!b.is_unknown());

        b.begin_fetch();
        b.apply_fetch(Err("connect timeout".into()));
        assert_eq!(b.badge_count(), 0);
        assert!(b.is_unknown());
        // The panel still has the last-known items; only the badge blanks.
        assert_eq!(b.items().len(), 3);

        b.apply_fetch(Ok(vec![item(1)]));
        assert_eq!(b.badge_count(), 1);
        assert!(!b.is_unknown());
    }

    #[test]
    fn one_action_in_flight_at_a_time() {
        let mut b = backlog_with(&[1, 2]);
        b.begin_skip(1).unwrap();
        assert_eq!(b.begin_skip(2).unwrap_err(), HitlError::ActionInFlight(1));
    }

    #[test]
    fn actions_on_unknown_issues_are_rejected() {
        let mut b = backlog_with(&[1]);
        assert_eq!(b.begin_skip(99).unwrap_err(), HitlError::UnknownIssue(99));
        assert_eq!(
            b.request_close(99).unwrap_err(),
            HitlError::UnknownIssue(99)
        );
    }

    #[test]
    fn never_fetched_is_unknown_with_zero_badge() {
        let b = HitlBacklog::new();
        assert_eq!(b.badge_count(), 0);
        assert!(b.is_unknown());
    }
}

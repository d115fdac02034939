use std::collections::BTreeSet;

use od_core::types::PipelineSession;

/// One header group of the session list: all runs against a repository,
/// with counters summed from its own sessions only.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoGroup {
    pub repo: String,
    pub sessions: Vec<PipelineSession>,
    pub issues_processed: usize,
    pub issues_succeeded: u32,
    pub issues_failed: u32,
    /// Set from the selection state when the group is projected for display.
    pub collapsed: bool,
}

/// Group a flat session list by `repo`, in repo order, preserving each
/// group's original session order. Session records are never mutated.
pub fn group_by_repo(sessions: &[PipelineSession]) -> Vec<RepoGroup> {
    let mut groups: Vec<RepoGroup> = Vec::new();
    for session in sessions {
        let group = match groups.iter_mut().find(|g| g.repo == session.repo) {
            Some(g) => g,
            None => {
                groups.push(RepoGroup {
                    repo: session.repo.clone(),
                    sessions: Vec::new(),
                    issues_processed: 0,
                    issues_succeeded: 0,
                    issues_failed: 0,
                    collapsed: false,
                });
                groups.last_mut().expect("just pushed")
            }
        };
        group.issues_processed += session.issues_processed.len();
        group.issues_succeeded += session.issues_succeeded;
        group.issues_failed += session.issues_failed;
        group.sessions.push(session.clone());
    }
    groups.sort_by(|a, b| a.repo.cmp(&b.repo));
    groups
}

/// Pure UI state layered on top of the read-only session records:
/// per-repo collapse and single-session selection.
#[derive(Debug, Default)]
pub struct SessionSelection {
    collapsed: BTreeSet<String>,
    selected: Option<String>,
}

impl SessionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, repo: &str) -> bool {
        self.collapsed.contains(repo)
    }

    pub fn toggle_collapsed(&mut self, repo: &str) {
        if !self.collapsed.remove(repo) {
            self.collapsed.insert(repo.to_string());
        }
    }

    /// Select a single session; other views scope to its issue set.
    pub fn select(&mut self, session_id: &str) {
        self.selected = Some(session_id.to_string());
    }

    /// "All": clear the scope.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The issue scope implied by the current selection, or `None` for "All".
    ///
    /// A selection pointing at a session that no longer exists (the list was
    /// re-fetched) behaves like "All" rather than an empty scope.
    pub fn issue_scope(&self, sessions: &[PipelineSession]) -> Option<Vec<u64>> {
        let id = self.selected.as_deref()?;
        sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.issues_processed.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(id: &str, repo: &str, issues: Vec<u64>, ok: u32, fail: u32) -> PipelineSession {
        PipelineSession {
            id: id.into(),
            repo: repo.into(),
            started_at: Utc::now(),
            ended_at: None,
            issues_processed: issues,
            issues_succeeded: ok,
            issues_failed: fail,
            status: "completed".into(),
        }
    }

    #[test]
    fn groups_by_repo_with_per_group_sums() {
        let sessions = vec![
            session("s1", "org/a", vec![1, 2], 2, 0),
            session("s2", "org/b", vec![3], 0, 1),
            session("s3", "org/a", vec![4, 5, 6], 2, 1),
        ];
        let groups = group_by_repo(&sessions);
        assert_eq!(groups.len(), 2);

        let a = &groups[0];
        assert_eq!(a.repo, "org/a");
        assert_eq!(a.sessions.len(), 2);
        assert_eq!(a.issues_processed, 5);
        assert_eq!(a.issues_succeeded, 4);
        assert_eq!(a.issues_failed, 1);

        let b = &groups[1];
        assert_eq!(b.repo, "org/b");
        assert_eq!(b.sessions.len(), 1);
        assert_eq!(b.issues_processed, 1);
        assert_eq!(b.issues_failed, 1);
    }

    #[test]
    fn empty_list_groups_to_nothing() {
        assert!(group_by_repo(&[]).is_empty());
    }

    #[test]
    fn collapse_is_independent_per_repo() {
        let mut sel = SessionSelection::new();
        sel.toggle_collapsed("org/a");
        assert!(sel.is_collapsed("org/a"));
        assert!(!sel.is_collapsed("org/b"));
        sel.toggle_collapsed("org/a");
        assert!(!sel.is_collapsed("org/a"));
    }

    #[test]
    fn selection_scopes_to_session_issues() {
        let sessions = vec![
            session("s1", "org/a", vec![1, 2], 2, 0),
            session("s2", "org/a", vec![7], 1, 0),
        ];
        let mut sel = SessionSelection::new();
        assert_eq!(sel.issue_scope(&sessions), None);

        sel.select("s2");
        assert_eq!(sel.issue_scope(&sessions), Some(vec![7]));

        sel.clear();
        assert_eq!(sel.issue_scope(&sessions), None);
    }

    #[test]
    fn stale_selection_falls_back_to_all() {
        let sessions = vec![session("s1", "org/a", vec![1], 1, 0)];
        let mut sel = SessionSelection::new();
        sel.select("gone");
        assert_eq!(sel.issue_scope(&sessions), None);
    }
}

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use od_client::service::Action;
use od_core::types::WorkerKey;
use od_store::store::{DashSnapshot, DashStore};

/// Tab names displayed in the header.
pub const TAB_NAMES: &[&str] = &["Pipeline", "Stream", "Sessions", "HITL"];

pub const TAB_PIPELINE: usize = 0;
pub const TAB_STREAM: usize = 1;
pub const TAB_SESSIONS: usize = 2;
pub const TAB_HITL: usize = 3;

/// UI state layered over the latest store snapshot. All real state lives in
/// the store; the app only tracks navigation and the correction editor.
pub struct App {
    pub current_tab: usize,
    pub should_quit: bool,
    pub selected_index: usize,
    pub selected_worker: Option<WorkerKey>,
    pub editing: bool,
    pub correction_input: String,
    pub snapshot: DashSnapshot,
    actions: flume::Sender<Action>,
}

impl App {
    pub fn new(actions: flume::Sender<Action>) -> Self {
        // Placeholder until the service publishes its first snapshot.
        let snapshot = DashStore::new(1, 1).snapshot();
        Self {
            current_tab: 0,
            should_quit: false,
            selected_index: 0,
            selected_worker: None,
            editing: false,
            correction_input: String::new(),
            snapshot,
            actions,
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: DashSnapshot) {
        self.snapshot = snapshot;
        let len = self.current_list_len();
        if len == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    fn dispatch(&self, action: Action) {
        let _ = self.actions.send(action);
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if self.editing {
            self.on_editor_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }

            // Tab switching: 1-4, Tab / Shift-Tab
            KeyCode::Char(c @ '1'..='4') => {
                self.current_tab = (c as usize) - ('1' as usize);
                self.selected_index = 0;
            }
            KeyCode::Tab => {
                self.current_tab = (self.current_tab + 1) % TAB_NAMES.len();
                self.selected_index = 0;
            }
            KeyCode::BackTab => {
                self.current_tab = if self.current_tab == 0 {
                    TAB_NAMES.len() - 1
                } else {
                    self.current_tab - 1
                };
                self.selected_index = 0;
            }

            // List navigation
            KeyCode::Char('j') | KeyCode::Down => {
                let max = self.current_list_len();
                if max > 0 && self.selected_index < max - 1 {
                    self.selected_index += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            KeyCode::Char('r') => self.dispatch(Action::Refresh),

            _ => match self.current_tab {
                TAB_PIPELINE => self.on_pipeline_key(key),
                TAB_SESSIONS => self.on_sessions_key(key),
                TAB_HITL => self.on_hitl_key(key),
                _ => {}
            },
        }
    }

    fn on_pipeline_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('s') => self.dispatch(Action::StartPipeline),
            KeyCode::Char('x') => self.dispatch(Action::StopPipeline),
            KeyCode::Enter => {
                self.selected_worker = self
                    .snapshot
                    .workers
                    .get(self.selected_index)
                    .map(|w| w.key);
            }
            KeyCode::Esc => self.selected_worker = None,
            _ => {}
        }
    }

    fn on_sessions_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => match self.session_rows().into_iter().nth(self.selected_index) {
                Some(SessionRow::Header { repo }) => {
                    self.dispatch(Action::ToggleRepoCollapsed { repo });
                }
                Some(SessionRow::Session { id, .. }) => {
                    self.dispatch(Action::SelectSession { id });
                }
                None => {}
            },
            KeyCode::Char('a') => self.dispatch(Action::ClearSessionSelection),
            KeyCode::Char('c') => {
                if let Some(row) = self.session_rows().into_iter().nth(self.selected_index) {
                    let repo = match row {
                        SessionRow::Header { repo } | SessionRow::Session { repo, .. } => repo,
                    };
                    self.dispatch(Action::ToggleRepoCollapsed { repo });
                }
            }
            _ => {}
        }
    }

    fn on_hitl_key(&mut self, key: KeyEvent) {
        let issue = self
            .snapshot
            .hitl
            .items
            .get(self.selected_index)
            .map(|i| i.issue);
        let Some(issue) = issue else { return };

        match key.code {
            KeyCode::Char('s') => self.dispatch(Action::Skip { issue }),
            KeyCode::Char('d') => self.dispatch(Action::RequestClose { issue }),
            KeyCode::Char('y') => {
                if self.snapshot.hitl.confirm_close == Some(issue) {
                    self.dispatch(Action::ConfirmClose { issue });
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.dispatch(Action::CancelClose),
            KeyCode::Char('e') => {
                self.editing = true;
                self.correction_input.clear();
            }
            _ => {}
        }
    }

    fn on_editor_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.editing = false;
                self.correction_input.clear();
            }
            KeyCode::Enter => {
                // Empty corrections never leave the client.
                if self.correction_input.trim().is_empty() {
                    return;
                }
                if let Some(item) = self.snapshot.hitl.items.get(self.selected_index) {
                    self.dispatch(Action::Correct {
                        issue: item.issue,
                        text: self.correction_input.clone(),
                    });
                }
                self.editing = false;
                self.correction_input.clear();
            }
            KeyCode::Backspace => {
                self.correction_input.pop();
            }
            KeyCode::Char(c) => self.correction_input.push(c),
            _ => {}
        }
    }

    /// Returns the length of the primary list for the current tab.
    pub fn current_list_len(&self) -> usize {
        match self.current_tab {
            TAB_PIPELINE => self.snapshot.workers.len(),
            TAB_STREAM => 0,
            TAB_SESSIONS => self.session_rows().len(),
            TAB_HITL => self.snapshot.hitl.items.len(),
            _ => 0,
        }
    }

    /// The session list in display order: one header row per repo group,
    /// then its sessions unless the group is collapsed.
    pub fn session_rows(&self) -> Vec<SessionRow> {
        let mut rows = Vec::new();
        for group in &self.snapshot.session_groups {
            rows.push(SessionRow::Header {
                repo: group.repo.clone(),
            });
            if group.collapsed {
                continue;
            }
            for s in &group.sessions {
                rows.push(SessionRow::Session {
                    repo: group.repo.clone(),
                    id: s.id.clone(),
                });
            }
        }
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRow {
    Header { repo: String },
    Session { repo: String, id: String },
}

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem};
use ratatui::Frame;

use crate::app::{App, SessionRow};

/// Tab 3: sessions grouped by repository.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let rows = app.session_rows();
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let line = match row {
                SessionRow::Header { repo } => {
                    let group = app
                        .snapshot
                        .session_groups
                        .iter()
                        .find(|g| &g.repo == repo);
                    let (count, ok, failed, collapsed) = group
                        .map(|g| {
                            (
                                g.sessions.len(),
                                g.issues_succeeded,
                                g.issues_failed,
                                g.collapsed,
                            )
                        })
                        .unwrap_or((0, 0, 0, false));
                    let marker = if collapsed { "▸" } else { "▾" };
                    Line::from(vec![
                        Span::styled(
                            format!("{marker} {repo} "),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!("({count} sessions, {ok} ok, {failed} failed)"),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ])
                }
                SessionRow::Session { id, .. } => {
                    let session = app
                        .snapshot
                        .session_groups
                        .iter()
                        .flat_map(|g| g.sessions.iter())
                        .find(|s| &s.id == id);
                    let selected_marker = if app.snapshot.selected_session.as_deref() == Some(id)
                    {
                        "» "
                    } else {
                        "  "
                    };
                    match session {
                        Some(s) => {
                            let when = s.started_at.format("%Y-%m-%d %H:%M");
                            let status_color = match s.status.as_str() {
                                "running" => Color::Green,
                                "failed" => Color::Red,
                                _ => Color::White,
                            };
                            Line::from(vec![
                                Span::raw(selected_marker),
                                Span::raw(format!("{id}  {when}  ")),
                                Span::styled(
                                    s.status.clone(),
                                    Style::default().fg(status_color),
                                ),
                                Span::styled(
                                    format!(
                                        "  {} issues ({} ok, {} failed)",
                                        s.issues_processed.len(),
                                        s.issues_succeeded,
                                        s.issues_failed
                                    ),
                                    Style::default().fg(Color::DarkGray),
                                ),
                            ])
                        }
                        None => Line::from(format!("  {id}")),
                    }
                }
            };
            let item = ListItem::new(line);
            if i == app.selected_index {
                item.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                item
            }
        })
        .collect();

    let scope = match &app.snapshot.selected_session {
        Some(id) => format!(" Sessions — scoped to {id} [a]ll "),
        None => " Sessions [enter]select [c]ollapse ".to_string(),
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(scope));
    frame.render_widget(list, area);
}

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

use crate::app::App;

/// Tab 4: the escalation backlog and its correction editor.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    render_backlog(frame, app, chunks[0]);
    render_editor(frame, app, chunks[1]);
}

fn render_backlog(frame: &mut Frame, app: &App, area: Rect) {
    let hitl = &app.snapshot.hitl;

    let mut items: Vec<ListItem> = Vec::new();
    for (i, item) in hitl.items.iter().enumerate() {
        let mut spans = vec![
            Span::styled(
                format!("#{} ", item.issue),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(item.title.clone()),
            Span::styled(
                format!("  — {}", item.cause),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if let Some(pr) = item.pr {
            spans.push(Span::styled(
                format!("  PR #{pr}"),
                Style::default().fg(Color::Cyan),
            ));
        }
        if hitl.confirm_close == Some(item.issue) {
            spans.push(Span::styled(
                "  close? [y]es [n]o",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        let mut entry = ListItem::new(Line::from(spans));
        if i == app.selected_index {
            entry = entry.style(Style::default().add_modifier(Modifier::REVERSED));
        }
        items.push(entry);
    }

    if hitl.items.is_empty() {
        let note = if hitl.unknown {
            "backlog unavailable (refresh pending)"
        } else {
            "nothing is waiting on a human"
        };
        items.push(ListItem::new(Line::from(Span::styled(
            note,
            Style::default().fg(Color::DarkGray),
        ))));
    }

    let mut title = format!(" HITL backlog ({}) ", hitl.badge);
    if hitl.loading {
        title.push_str("… ");
    }
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn render_editor(frame: &mut Frame, app: &App, area: Rect) {
    let selected_issue = app
        .snapshot
        .hitl
        .items
        .get(app.selected_index)
        .map(|i| i.issue);

    let line = if app.editing {
        Line::from(vec![
            Span::styled("correction> ", Style::default().fg(Color::Yellow)),
            Span::raw(app.correction_input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ])
    } else if let Some(err) = selected_issue.and_then(|issue| hitl_error(app, issue)) {
        Line::from(Span::styled(err, Style::default().fg(Color::Red)))
    } else {
        Line::from(Span::styled(
            "[e]dit correction  [s]kip  [d]close",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let block_title = match selected_issue {
        Some(issue) => format!(" Action — #{issue} "),
        None => " Action ".to_string(),
    };
    let editor =
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(block_title));
    frame.render_widget(editor, area);
}

fn hitl_error(app: &App, issue: u64) -> Option<String> {
    app.snapshot
        .hitl
        .errors
        .get(&issue)
        .map(|e| format!("#{issue}: {e}"))
}

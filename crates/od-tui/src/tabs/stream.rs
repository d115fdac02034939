use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem};
use ratatui::Frame;

use crate::app::App;

/// Tab 2: transcript feed (left) and raw event timeline (right).
///
/// With a worker selected on the Pipeline tab, the left panel shows its full
/// log; otherwise the combined per-worker tails, grouped by slot.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_transcripts(frame, app, cols[0]);
    render_events(frame, app, cols[1]);
}

fn render_transcripts(frame: &mut Frame, app: &App, area: Rect) {
    let (title, items) = match app.selected_worker {
        Some(key) => {
            let lines: Vec<ListItem> = app
                .snapshot
                .workers
                .iter()
                .find(|w| w.key == key)
                .map(|w| {
                    w.transcript
                        .iter()
                        .map(|l| ListItem::new(Line::from(l.clone())))
                        .collect()
                })
                .unwrap_or_default();
            (format!(" Log: {key} [esc]all "), lines)
        }
        None => {
            let mut lines = Vec::new();
            for group in &app.snapshot.feed {
                lines.push(ListItem::new(Line::from(Span::styled(
                    format!("── {} ──", group.label),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))));
                for l in &group.lines {
                    lines.push(ListItem::new(Line::from(format!("  {l}"))));
                }
            }
            (" Transcripts ".to_string(), lines)
        }
    };

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn render_events(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .snapshot
        .events
        .iter()
        .rev()
        .map(|ev| {
            let ts = ev.timestamp.format("%H:%M:%S");
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{ts}] "), Style::default().fg(Color::DarkGray)),
                Span::styled(ev.kind.to_string(), Style::default().fg(Color::Cyan)),
                Span::raw(summarize(ev)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Events ({}) ", app.snapshot.events.len())),
    );
    frame.render_widget(list, area);
}

fn summarize(ev: &od_core::types::Event) -> String {
    match ev.data.get("issue").and_then(|v| v.as_u64()) {
        Some(issue) => format!(" #{issue}"),
        None => String::new(),
    }
}

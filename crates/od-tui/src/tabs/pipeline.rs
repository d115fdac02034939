use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table};
use ratatui::Frame;

use od_core::types::StageRole;

use crate::app::App;
use crate::ui::stage_color;

/// Tab 1: stage health cards, loop badges, worker table.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // stage cards
            Constraint::Length(4), // loops + limits
            Constraint::Min(0),    // workers
        ])
        .split(area);

    render_stage_cards(frame, app, chunks[0]);
    render_loops(frame, app, chunks[1]);
    render_workers(frame, app, chunks[2]);
}

fn render_stage_cards(frame: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    for (i, role) in StageRole::ALL.iter().enumerate() {
        let Some(status) = app.snapshot.derived.stages.get(role) else {
            continue;
        };
        let depth = app
            .snapshot
            .derived
            .stage_depth
            .get(role)
            .copied()
            .unwrap_or(0);
        let color = stage_color(status.color);
        let state = if !status.enabled {
            "off"
        } else if status.active_workers > 0 {
            "active"
        } else {
            "idle"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", role))
            .border_style(Style::default().fg(color));
        let text = Paragraph::new(vec![
            Line::from(Span::styled(
                format!("{} working / {} queued", status.active_workers, depth),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(state, Style::default().fg(Color::DarkGray))),
        ])
        .block(block)
        .alignment(ratatui::layout::Alignment::Center);
        frame.render_widget(text, cols[i]);
    }
}

fn render_loops(frame: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let mut spans: Vec<Span> = Vec::new();
    for (name, status) in &app.snapshot.derived.loops {
        spans.push(Span::styled(
            "● ",
            Style::default().fg(stage_color(status.color)),
        ));
        spans.push(Span::raw(name.clone()));
        spans.push(Span::raw("  "));
    }
    let loops = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Background loops "),
    );
    frame.render_widget(loops, cols[0]);

    let limits = app.snapshot.limits;
    let limits_text = Paragraph::new(Line::from(format!(
        "planners {} / workers {} / reviewers {}",
        limits.max_planners, limits.max_workers, limits.max_reviewers
    )))
    .block(Block::default().borders(Borders::ALL).title(" Limits "));
    frame.render_widget(limits_text, cols[1]);
}

fn render_workers(frame: &mut Frame, app: &App, area: Rect) {
    if app.snapshot.workers.is_empty() {
        let empty = List::new(vec![ListItem::new("no workers tracked")]).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Workers [s]tart [x]stop "),
        );
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Slot"),
        Cell::from("Status"),
        Cell::from("Title"),
        Cell::from("Branch"),
        Cell::from("PR"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .snapshot
        .workers
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let status_color = if w.status.is_active() {
                Color::Green
            } else if w.status.is_terminal() {
                Color::DarkGray
            } else {
                Color::Yellow
            };
            let row = Row::new(vec![
                Cell::from(w.key.to_string()),
                Cell::from(w.status.as_str()).style(Style::default().fg(status_color)),
                Cell::from(w.title.clone().unwrap_or_default()),
                Cell::from(w.branch.clone().unwrap_or_default()),
                Cell::from(w.pr.map(|n| format!("#{n}")).unwrap_or_default()),
            ]);
            if i == app.selected_index {
                row.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Min(20),
            Constraint::Length(24),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Workers [s]tart [x]stop [enter]log "),
    );
    frame.render_widget(table, area);
}

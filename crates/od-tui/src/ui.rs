use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Tabs};
use ratatui::Frame;

use crate::app::{App, TAB_NAMES};
use crate::tabs;
use crate::widgets::status_bar;

/// Master render function: header tabs, content area, status bar.
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tab bar
            Constraint::Min(0),    // content
            Constraint::Length(1), // status bar
        ])
        .split(frame.area());

    render_tab_bar(frame, app, chunks[0]);
    render_content(frame, app, chunks[1]);
    status_bar::render(frame, app, chunks[2]);
}

fn render_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = TAB_NAMES
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let num = format!("{}", i + 1);
            let mut spans = vec![
                Span::styled(
                    num,
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(":"),
                Span::raw(*t),
            ];
            if *t == "HITL" && app.snapshot.hitl.badge > 0 {
                spans.push(Span::styled(
                    format!(" ({})", app.snapshot.hitl.badge),
                    Style::default().fg(Color::Red),
                ));
            }
            Line::from(spans)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .title(" opsdeck ")
                .title_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .select(app.current_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::raw(" | "));

    frame.render_widget(tabs, area);
}

fn render_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        0 => tabs::pipeline::render(frame, app, area),
        1 => tabs::stream::render(frame, app, area),
        2 => tabs::sessions::render(frame, app, area),
        3 => tabs::hitl::render(frame, app, area),
        _ => {}
    }
}

/// Shared color mapping for the derived stage/loop classification.
pub fn stage_color(color: od_core::types::StageColor) -> Color {
    match color {
        od_core::types::StageColor::Green => Color::Green,
        od_core::types::StageColor::Yellow => Color::Yellow,
        od_core::types::StageColor::Red => Color::Red,
    }
}

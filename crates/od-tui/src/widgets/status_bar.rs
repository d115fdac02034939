use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use od_store::control::ControlView;

use crate::app::App;

/// Render the bottom status bar: connection, control state, key hints.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = Vec::new();

    // Connectivity loss freezes the view; the indicator is the only change.
    if app.snapshot.connected {
        spans.push(Span::styled("● connected", Style::default().fg(Color::Green)));
    } else {
        spans.push(Span::styled(
            "■ disconnected (stale)",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    spans.push(Span::raw("  "));

    let control = app.snapshot.control;
    let control_color = match control {
        ControlView::Holding => Color::Yellow,
        ControlView::Stable(od_core::types::OrchestratorStatus::Running) => Color::Green,
        ControlView::Stable(od_core::types::OrchestratorStatus::CreditsPaused) => Color::Red,
        _ => Color::White,
    };
    spans.push(Span::styled(
        control.label(),
        Style::default().fg(control_color).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw("  "));

    spans.push(Span::styled("[r]", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Refresh  "));
    spans.push(Span::styled("[q]", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Quit"));

    let bar = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(bar, area);
}

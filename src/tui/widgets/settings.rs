//! Settings Widget
//!
//! Modal dialog for the Google API key.

use crate::tui::app::App;
use crate::tui::theme::{Icons, Theme};
use crate::tui::ui::centered_rect;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Render the settings modal
pub fn render_settings(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 40, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Settings ")
        .borders(Borders::ALL)
        .border_style(Theme::frame_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Instructions
            Constraint::Min(4),    // Key field
            Constraint::Length(2), // Footer
        ])
        .split(inner);

    render_instructions(frame, chunks[0]);
    render_key_field(frame, chunks[1], app);
    render_footer(frame, chunks[2], app);
}

fn render_instructions(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Google AI (Gemini) API key. Stored encrypted on this machine.",
            Theme::value(),
        )),
        Line::from(vec![
            Span::styled("[e]", Theme::key()),
            Span::styled(" Edit ", Theme::label()),
            Span::styled("[Enter]", Theme::key()),
            Span::styled(" Save ", Theme::label()),
            Span::styled("[Esc]", Theme::key()),
            Span::styled(" Close", Theme::label()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_key_field(frame: &mut Frame, area: Rect, app: &App) {
    let status = app.provider_status();

    let badge = if status.has_key {
        Span::styled(format!(" {} Configured", Icons::DONE), Theme::ok())
    } else {
        Span::styled(format!(" {} Not set", Icons::IDLE), Theme::hint())
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{} ", Icons::ROW_MARKER), Theme::brand()),
            Span::styled(format!("{:<12}", "Google AI"), Theme::brand()),
            badge,
        ]),
        Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("Model: {}", app.config.llm.model), Theme::hint()),
        ]),
    ];

    if app.settings_show_input {
        let input_display = if app.settings_input.is_empty() {
            "Enter API key...".to_string()
        } else {
            Icons::MASK.repeat(app.settings_input.chars().count())
        };

        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("[{}]", input_display), Theme::input()),
            Span::styled(" ", Theme::value()),
            Span::styled(Icons::CURSOR, Theme::busy()),
        ]));
    } else if let Some(hint) = &status.key_hint {
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("Key: {}", hint), Theme::hint()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.settings_show_input {
        "Type your API key, then press Enter to save"
    } else if app.provider_status().has_key {
        "Press [e] to replace the key"
    } else {
        "Press [e] to enter an API key"
    };

    let line = Line::from(Span::styled(help_text, Theme::label()));
    frame.render_widget(Paragraph::new(line), area);
}

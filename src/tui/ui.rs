//! UI Rendering
//!
//! Main UI layout and rendering logic for the TUI.

use crate::tui::app::{App, StatusLevel, View};
use crate::tui::theme::{Icons, Theme};
use crate::tui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let input_height = if app.adding_file { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Min(8),               // Queue table
            Constraint::Length(8),            // Details
            Constraint::Length(input_height), // Path input
            Constraint::Length(1),            // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    widgets::render_queue_table(frame, chunks[1], &app.state, app.selected);
    widgets::render_detail(frame, chunks[2], app.selected_job());
    if app.adding_file {
        render_path_input(frame, chunks[3], app);
    }
    render_status_bar(frame, chunks[4], app);

    match app.view {
        View::Settings => widgets::render_settings(frame, app),
        View::Help => render_help(frame),
        View::Queue => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled("vox-emotion", Theme::brand()),
        Span::styled(" voice emotion analysis  ", Theme::label()),
        Span::styled(app.config.llm.model.clone(), Theme::hint()),
        Span::raw("  "),
        Theme::key_indicator(app.provider_status().has_key),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::frame()),
    );

    frame.render_widget(title, area);
}

fn render_path_input(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Add file ")
        .borders(Borders::ALL)
        .border_style(Theme::frame_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(&app.path_input, inner);
}

/// Text for the left side of the status bar
pub fn status_text(app: &App) -> (String, StatusLevel) {
    if app.is_running() {
        let counts = app.state.counts();
        let done = counts.completed + counts.failed;
        return (
            format!("{} Running ({}/{} finished)", Icons::PROCESSING, done, counts.total()),
            StatusLevel::Info,
        );
    }
    match &app.status {
        Some(status) => (status.text.clone(), status.level),
        None => ("Ready".to_string(), StatusLevel::Info),
    }
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let (text, level) = status_text(app);
    let style = Theme::status_message(level, app.is_running());

    let shortcuts = [
        ("[a]", " Add "),
        ("[r]", " Run "),
        ("[d]", " Remove "),
        ("[x]", " Export "),
        ("[Ctrl+S]", " Settings "),
        ("[F1]", " Help "),
        ("[q]", " Quit"),
    ];

    let spans: Vec<Span> = std::iter::once(Span::styled(text, style))
        .chain(std::iter::once(Span::raw(" │ ")))
        .chain(shortcuts.iter().flat_map(|(key, desc)| {
            [
                Span::styled(*key, Theme::key()),
                Span::styled(*desc, Theme::label()),
            ]
        }))
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let entries = [
        ("a            ", "Add an audio file by path"),
        ("r            ", "Analyze idle and failed jobs"),
        ("d / Delete   ", "Remove the selected job"),
        ("c            ", "Clear the queue (not while running)"),
        ("x            ", "Export results to CSV"),
        ("↑/↓ Home/End ", "Select job"),
        ("Ctrl+S       ", "Open settings"),
        ("Esc          ", "Close modal / Cancel"),
        ("q            ", "Quit"),
        ("Ctrl+C       ", "Force quit"),
        ("F1           ", "Show this help"),
    ];

    let mut help_lines = vec![
        Line::from(Span::styled("Keyboard Shortcuts", Theme::column_header())),
        Line::from(""),
    ];
    help_lines.extend(entries.iter().map(|(key, desc)| {
        Line::from(vec![
            Span::styled(*key, Theme::key()),
            Span::styled(*desc, Theme::value()),
        ])
    }));
    help_lines.push(Line::from(""));
    help_lines.push(Line::from(Span::styled("Press any key to close", Theme::hint())));

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Theme::frame_focused()),
    );

    frame.render_widget(paragraph, area);
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::encoding::FileEncoder;
    use crate::queue::JobQueue;
    use crate::settings::{SettingsStorage, UserSettings};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn app(dir: &TempDir) -> App {
        App::new(
            Config::default(),
            UserSettings::default(),
            SettingsStorage::with_path(dir.path().to_path_buf()),
            JobQueue::new(),
            Arc::new(FileEncoder::new()),
        )
    }

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let rect = centered_rect(60, 40, area);
        assert_eq!(rect.width, 60);
        assert_eq!(rect.height, 20);
        assert_eq!(rect.x, 20);
    }

    #[tokio::test]
    async fn test_render_all_views() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, b"data").unwrap();
        app.add_file(path).await;

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        for view in [View::Queue, View::Settings, View::Help] {
            app.view = view;
            terminal.draw(|frame| render(frame, &app)).unwrap();
        }

        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Keyboard Shortcuts"));
    }

    #[tokio::test]
    async fn test_status_text_defaults_to_ready() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        assert_eq!(status_text(&app), ("Ready".to_string(), StatusLevel::Info));
    }
}

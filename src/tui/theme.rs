//! Palette and styles for the queue view
//!
//! Job lifecycle colors live in [`Theme::job_status`] so the table, the
//! detail pane and the status bar agree on them.

use crate::queue::JobStatus;
use crate::tui::app::StatusLevel;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

const VIOLET: Color = Color::Rgb(167, 139, 250);
const VIOLET_DEEP: Color = Color::Rgb(124, 58, 237);
const GREEN: Color = Color::Rgb(34, 197, 94);
const AMBER: Color = Color::Rgb(251, 191, 36);
const RED: Color = Color::Rgb(239, 68, 68);
const FG: Color = Color::Rgb(229, 229, 229);
const FG_MUTED: Color = Color::Rgb(161, 161, 161);
const FG_FAINT: Color = Color::Rgb(82, 82, 82);
const FRAME: Color = Color::Rgb(51, 51, 51);
const ROW_BG: Color = Color::Rgb(38, 38, 38);

pub struct Theme;

impl Theme {
    /// File names, reasoning, anything the user reads
    pub fn value() -> Style {
        Style::default().fg(FG)
    }

    /// Field labels and secondary columns
    pub fn label() -> Style {
        Style::default().fg(FG_MUTED)
    }

    pub fn hint() -> Style {
        Style::default().fg(FG_FAINT)
    }

    /// App title and detected emotion
    pub fn brand() -> Style {
        Style::default().fg(VIOLET).add_modifier(Modifier::BOLD)
    }

    pub fn column_header() -> Style {
        Style::default().fg(FG).add_modifier(Modifier::BOLD)
    }

    pub fn frame() -> Style {
        Style::default().fg(FRAME)
    }

    pub fn frame_focused() -> Style {
        Style::default().fg(VIOLET_DEEP)
    }

    /// Keyboard shortcut in hints and help
    pub fn key() -> Style {
        Style::default().fg(VIOLET).add_modifier(Modifier::BOLD)
    }

    pub fn row_selected() -> Style {
        Style::default().bg(ROW_BG).add_modifier(Modifier::BOLD)
    }

    /// Text being typed into a masked field
    pub fn input() -> Style {
        Style::default().fg(AMBER)
    }

    pub fn ok() -> Style {
        Style::default().fg(GREEN)
    }

    pub fn busy() -> Style {
        Style::default().fg(AMBER).add_modifier(Modifier::BOLD)
    }

    pub fn error() -> Style {
        Style::default().fg(RED)
    }

    /// Icon + label and color for a job's status cell
    pub fn job_status(status: &JobStatus) -> (String, Style) {
        match status {
            JobStatus::Idle => (format!("{} Idle", Icons::IDLE), Self::hint()),
            JobStatus::Processing => (format!("{} Processing", Icons::PROCESSING), Self::busy()),
            JobStatus::Completed { .. } => (format!("{} Done", Icons::DONE), Self::ok()),
            JobStatus::Failed { error } => (
                format!("{} {}", Icons::FAILED, error.kind.user_message()),
                Self::error(),
            ),
        }
    }

    pub fn status_message(level: StatusLevel, running: bool) -> Style {
        match level {
            StatusLevel::Info if running => Self::busy(),
            StatusLevel::Info => Self::label(),
            StatusLevel::Success => Self::ok(),
            StatusLevel::Error => Self::error(),
        }
    }

    /// Green dot when an API key is available, red otherwise
    pub fn key_indicator(has_key: bool) -> Span<'static> {
        let style = if has_key { Self::ok() } else { Self::error() };
        Span::styled(Icons::KEY, style)
    }
}

pub struct Icons;

impl Icons {
    pub const IDLE: &'static str = "○";
    pub const PROCESSING: &'static str = "●";
    pub const DONE: &'static str = "✓";
    pub const FAILED: &'static str = "✗";
    pub const KEY: &'static str = "●";
    pub const CURSOR: &'static str = "▌";
    pub const ROW_MARKER: &'static str = "▶";
    pub const MASK: &'static str = "•";
}

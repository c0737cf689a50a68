//! Queue Table Widget
//!
//! One row per job, plus a detail pane for the selected job.

use crate::queue::{Job, JobStatus, QueueState};
use crate::tui::theme::{Icons, Theme};
use crate::utils::{format_size, truncate};
use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

const NAME_WIDTH: usize = 32;
const EMOTION_WIDTH: usize = 16;

fn job_row(job: &Job) -> Row<'static> {
    let (status, status_style) = Theme::job_status(&job.status);
    let (emotion, level, identity) = match job.result() {
        Some(result) => (
            truncate(&result.emotion_type, EMOTION_WIDTH),
            result.emotion_level.to_string(),
            result.voice_identity.clone(),
        ),
        None => (String::new(), String::new(), String::new()),
    };

    Row::new(vec![
        Cell::from(truncate(job.name(), NAME_WIDTH)).style(Theme::value()),
        Cell::from(format_size(job.source.size_bytes)).style(Theme::label()),
        Cell::from(status).style(status_style),
        Cell::from(emotion).style(Theme::value()),
        Cell::from(level).style(Theme::value()),
        Cell::from(identity).style(Theme::label()),
    ])
}

/// Render the job table
pub fn render_queue_table(frame: &mut Frame, area: Rect, state: &QueueState, selected: usize) {
    let counts = state.counts();
    let title = format!(
        " Queue ({} jobs: {} idle, {} done, {} failed) ",
        counts.total(),
        counts.idle,
        counts.completed,
        counts.failed
    );

    let header = Row::new(vec!["File", "Size", "Status", "Emotion", "Lvl", "Voice"])
        .style(Theme::column_header());
    let rows: Vec<Row> = state.jobs.iter().map(job_row).collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(NAME_WIDTH as u16),
            Constraint::Length(10),
            Constraint::Length(22),
            Constraint::Length(EMOTION_WIDTH as u16),
            Constraint::Length(4),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Theme::frame_focused()),
    )
    .highlight_style(Theme::row_selected())
    .highlight_symbol(format!("{} ", Icons::ROW_MARKER));

    let mut table_state = TableState::default();
    if !state.jobs.is_empty() {
        table_state.select(Some(selected));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

/// Render details for the selected job
pub fn render_detail(frame: &mut Frame, area: Rect, job: Option<&Job>) {
    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .border_style(Theme::frame());

    let lines = match job {
        None => vec![Line::from(Span::styled(
            "Press [a] to add an audio file",
            Theme::hint(),
        ))],
        Some(job) => detail_lines(job),
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn detail_lines(job: &Job) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled("File: ", Theme::label()),
        Span::styled(job.source.path.display().to_string(), Theme::value()),
    ])];

    match &job.status {
        JobStatus::Completed { result } => {
            lines.push(Line::from(vec![
                Span::styled("Emotion: ", Theme::label()),
                Span::styled(
                    format!("{} ({}/10)", result.emotion_type, result.emotion_level),
                    Theme::brand(),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Voice: ", Theme::label()),
                Span::styled(result.voice_identity.clone(), Theme::value()),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(result.reasoning.clone(), Theme::value())));
        }
        JobStatus::Failed { error } => {
            lines.push(Line::from(Span::styled(
                format!("{} (after {} attempts)", error.kind.user_message(), error.attempts),
                Theme::error(),
            )));
            lines.push(Line::from(Span::styled(
                "Press [r] to retry failed jobs",
                Theme::hint(),
            )));
        }
        JobStatus::Processing => {
            lines.push(Line::from(Span::styled("Analyzing...", Theme::busy())));
        }
        JobStatus::Idle => {
            lines.push(Line::from(Span::styled("Waiting for the next run", Theme::hint())));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::AudioSource;
    use crate::queue::{FailureKind, JobError};
    use std::path::PathBuf;

    fn job() -> Job {
        Job::new(AudioSource::new(PathBuf::from("/audio/clip.wav"), 2048))
    }

    #[test]
    fn test_failed_status_uses_user_message() {
        let mut job = job();
        job.fail(JobError {
            kind: FailureKind::RateLimited,
            attempts: 3,
        });
        let (text, _) = Theme::job_status(&job.status);
        assert!(text.ends_with("frequency exceeded"));

        let detail: Vec<String> = detail_lines(&job).iter().map(|l| l.to_string()).collect();
        assert!(detail.iter().any(|l| l.contains("after 3 attempts")));
    }

    #[test]
    fn test_idle_detail() {
        let detail: Vec<String> = detail_lines(&job()).iter().map(|l| l.to_string()).collect();
        assert_eq!(detail[0], "File: /audio/clip.wav");
        assert_eq!(detail[1], "Waiting for the next run");
    }
}

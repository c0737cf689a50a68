//! Terminal User Interface Module
//!
//! Queue-driven interface for batch voice emotion analysis, built with Ratatui.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  vox-emotion voice emotion analysis   gemini-2.5-flash  ●        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─ Queue (3 jobs: 1 idle, 1 done, 1 failed) ──────────────────┐ │
//! │  │ ▶ clip.wav   1.20 MB  ✓ Done              joy   7  adult man │ │
//! │  │   take2.wav  800 KB   ✗ frequency exceeded                   │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! │  ┌─ Details ───────────────────────────────────────────────────┐ │
//! │  │ Emotion: joy (7/10)  Voice: adult man  reasoning...          │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! │  Ready │ [a] Add [r] Run [d] Remove [x] Export [F1] Help [q] Quit │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The batch run lives on its own Tokio task and mutates the shared
//! [`JobQueue`](crate::queue::JobQueue); the UI re-reads it every tick.

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, View};
pub use event::{AppAction, EventHandler};

use crate::config::Config;
use crate::encoding::FileEncoder;
use crate::queue::JobQueue;
use crate::settings::SettingsStorage;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

const TICK_RATE_MS: u64 = 100;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI application, queueing `files` before the first frame
pub async fn run(config: Config, files: Vec<PathBuf>) -> anyhow::Result<()> {
    info!("Starting TUI mode");

    let settings_storage = SettingsStorage::new();
    let settings = settings_storage.load().await.unwrap_or_else(|e| {
        error!("Failed to load settings, using defaults: {}", e);
        Default::default()
    });

    let mut app = App::new(
        config,
        settings,
        settings_storage,
        JobQueue::new(),
        Arc::new(FileEncoder::new()),
    );
    for file in files {
        app.add_file(file).await;
    }

    let mut terminal = init_terminal()?;
    let mut events = EventHandler::new(std::time::Duration::from_millis(TICK_RATE_MS));

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        match events.next().await {
            Some(action) => app.handle_action(action).await,
            None => break,
        }

        if app.should_quit {
            break;
        }
    }

    info!("TUI exited normally");
    Ok(())
}

//! Application State
//!
//! Holds the TUI's view of the job queue and turns key presses into queue
//! operations. The batch runner works on its own task; the app follows the
//! queue through a watch subscription and copies a new state on each tick
//! only when one was published.

use crate::analysis::{EmotionAnalyzer, InferenceClient};
use crate::config::Config;
use crate::encoding::{AudioSource, Encoder};
use crate::export;
use crate::queue::{BatchJobRunner, Job, JobQueue, QueueState, RunSummary};
use crate::settings::{ProviderStatus, SettingsStorage, UserSettings};
use crate::tui::event::{AppAction, QueueCommand};
use crate::types::AppError;
use futures::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tui_textarea::TextArea;

pub const DEFAULT_EXPORT_FILE: &str = "emotion-analysis.csv";

const PATH_PLACEHOLDER: &str = "Path to an audio file, then Enter";

/// Current view/screen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Queue,
    Settings,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
}

/// Main application state
pub struct App {
    pub config: Config,

    // UI State
    pub view: View,
    pub should_quit: bool,
    pub status: Option<StatusMessage>,

    // Queue State
    pub queue: JobQueue,
    /// Last state seen on `updates`
    pub state: QueueState,
    updates: watch::Receiver<QueueState>,
    pub selected: usize,
    pub path_input: TextArea<'static>,
    pub adding_file: bool,
    pub last_summary: Option<RunSummary>,
    pub export_path: PathBuf,

    // Settings State
    pub settings: UserSettings,
    pub settings_storage: SettingsStorage,
    pub settings_input: String,
    pub settings_show_input: bool,

    encoder: Arc<dyn Encoder>,
    client: Option<Arc<dyn InferenceClient>>,
    run_handle: Option<JoinHandle<Option<RunSummary>>>,
}

fn path_input() -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_cursor_line_style(ratatui::style::Style::default());
    input.set_placeholder_text(PATH_PLACEHOLDER);
    input
}

impl App {
    pub fn new(
        mut config: Config,
        settings: UserSettings,
        settings_storage: SettingsStorage,
        queue: JobQueue,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        settings.apply_to(&mut config.llm);
        let mut updates = queue.subscribe();
        let state = updates.borrow_and_update().clone();

        Self {
            config,
            view: View::Queue,
            should_quit: false,
            status: None,
            queue,
            state,
            updates,
            selected: 0,
            path_input: path_input(),
            adding_file: false,
            last_summary: None,
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
            settings,
            settings_storage,
            settings_input: String::new(),
            settings_show_input: false,
            encoder,
            client: None,
            run_handle: None,
        }
    }

    /// Use a fixed inference client instead of one built from config
    pub fn with_client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn selected_job(&self) -> Option<&Job> {
        self.state.jobs.get(self.selected)
    }

    pub fn provider_status(&self) -> ProviderStatus {
        self.settings.status()
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
        });
    }

    fn sync_state(&mut self) {
        self.state = self.updates.borrow_and_update().clone();
    }

    /// Take any newly published queue state and collect a finished run
    pub fn refresh(&mut self) {
        if self.updates.has_changed().unwrap_or(false) {
            self.sync_state();
        }
        if self.selected >= self.state.jobs.len() {
            self.selected = self.state.jobs.len().saturating_sub(1);
        }

        let finished = self.run_handle.as_ref().is_some_and(|h| h.is_finished());
        if !finished {
            return;
        }
        let outcome = self.run_handle.take().and_then(|handle| handle.now_or_never());
        match outcome {
            Some(Ok(Some(summary))) => {
                let level = if summary.failed > 0 {
                    StatusLevel::Error
                } else {
                    StatusLevel::Success
                };
                self.set_status(
                    level,
                    format!(
                        "Run finished: {} completed, {} failed",
                        summary.completed, summary.failed
                    ),
                );
                self.last_summary = Some(summary);
            }
            Some(Ok(None)) => {}
            Some(Err(e)) => {
                error!("Batch run task failed: {}", e);
                self.set_status(StatusLevel::Error, "Batch run stopped unexpectedly");
            }
            None => {}
        }
        self.sync_state();
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::ForceQuit => self.should_quit = true,
            AppAction::Tick => self.refresh(),
            AppAction::ToggleSettings => {
                self.view = if self.view == View::Settings {
                    View::Queue
                } else {
                    View::Settings
                };
                self.settings_show_input = false;
                self.settings_input.clear();
            }
            AppAction::ToggleHelp => {
                self.view = if self.view == View::Help {
                    View::Queue
                } else {
                    View::Help
                };
            }
            AppAction::Escape => {
                if self.adding_file {
                    self.adding_file = false;
                    self.path_input = path_input();
                } else if self.view != View::Queue {
                    self.view = View::Queue;
                    self.settings_show_input = false;
                    self.settings_input.clear();
                }
            }
            AppAction::Submit => match self.view {
                View::Settings => self.save_api_key().await,
                View::Queue if self.adding_file => self.submit_path().await,
                _ => {}
            },
            AppAction::SelectPrev => self.selected = self.selected.saturating_sub(1),
            AppAction::SelectNext => {
                if self.selected + 1 < self.state.jobs.len() {
                    self.selected += 1;
                }
            }
            AppAction::SelectFirst => self.selected = 0,
            AppAction::SelectLast => self.selected = self.state.jobs.len().saturating_sub(1),
            AppAction::Input(key) => self.handle_input(key),
        }
    }

    fn handle_input(&mut self, key: crossterm::event::KeyEvent) {
        use crossterm::event::KeyCode;

        match self.view {
            View::Help => self.view = View::Queue,
            View::Settings => {
                if self.settings_show_input {
                    match key.code {
                        KeyCode::Char(c) => self.settings_input.push(c),
                        KeyCode::Backspace => {
                            self.settings_input.pop();
                        }
                        _ => {}
                    }
                } else if key.code == KeyCode::Char('e') {
                    self.settings_show_input = true;
                }
            }
            View::Queue if self.adding_file => {
                self.path_input.input(key);
            }
            View::Queue => {
                if let Some(command) = QueueCommand::from_key(&key) {
                    self.handle_command(command);
                }
            }
        }
    }

    pub fn handle_command(&mut self, command: QueueCommand) {
        match command {
            QueueCommand::AddFile => {
                self.adding_file = true;
                self.path_input = path_input();
            }
            QueueCommand::Run => self.start_run(),
            QueueCommand::Remove => self.remove_selected(),
            QueueCommand::Clear => self.clear_queue(),
            QueueCommand::Export => self.export(),
            QueueCommand::Quit => self.should_quit = true,
        }
    }

    async fn submit_path(&mut self) {
        let raw = self.path_input.lines().join("");
        self.adding_file = false;
        self.path_input = path_input();

        let path = raw.trim().trim_matches(|c| c == '"' || c == '\'');
        if path.is_empty() {
            return;
        }
        self.add_file(PathBuf::from(path)).await;
    }

    /// Queue a file as a new Idle job
    pub async fn add_file(&mut self, path: PathBuf) {
        match AudioSource::from_path(&path).await {
            Ok(source) => {
                let name = source.name.clone();
                self.queue.push(source);
                self.refresh();
                self.selected = self.state.jobs.len().saturating_sub(1);
                self.set_status(StatusLevel::Info, format!("Added {}", name));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not add file");
                self.set_status(StatusLevel::Error, format!("Cannot add {}: {}", path.display(), e));
            }
        }
    }

    fn remove_selected(&mut self) {
        let Some(id) = self.selected_job().map(|job| job.id) else {
            return;
        };
        if let Some(job) = self.queue.remove(id) {
            self.set_status(StatusLevel::Info, format!("Removed {}", job.name()));
        }
        self.refresh();
    }

    fn clear_queue(&mut self) {
        match self.queue.clear() {
            Ok(count) => {
                self.selected = 0;
                self.set_status(StatusLevel::Info, format!("Cleared {} jobs", count));
            }
            Err(AppError::RunActive) => {
                self.set_status(StatusLevel::Error, "Cannot clear the queue while a run is active");
            }
            Err(e) => self.set_status(StatusLevel::Error, e.to_string()),
        }
        self.refresh();
    }

    fn build_client(&self) -> Result<Arc<dyn InferenceClient>, String> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }
        if !self.config.llm.has_api_key() {
            return Err("No API key configured. Press Ctrl+S to add one.".to_string());
        }
        EmotionAnalyzer::from_config(&self.config.llm)
            .map(|analyzer| Arc::new(analyzer) as Arc<dyn InferenceClient>)
            .map_err(|e| e.to_string())
    }

    /// Spawn a batch run over the pending jobs
    pub fn start_run(&mut self) {
        if self.queue.is_running() {
            self.set_status(StatusLevel::Info, "A run is already in progress");
            return;
        }
        let pending = self.queue.with_state(|s| s.pending_count());
        if pending == 0 {
            self.set_status(StatusLevel::Info, "Nothing to analyze");
            return;
        }

        let client = match self.build_client() {
            Ok(client) => client,
            Err(message) => {
                self.set_status(StatusLevel::Error, message);
                return;
            }
        };

        let runner = Arc::new(BatchJobRunner::from_config(
            self.queue.clone(),
            Arc::clone(&self.encoder),
            client,
            &self.config.batch,
        ));
        self.run_handle = Some(runner.spawn());
        self.last_summary = None;
        info!(jobs = pending, "Run started from TUI");
        self.set_status(StatusLevel::Info, format!("Analyzing {} files...", pending));
    }

    fn export(&mut self) {
        let jobs = self.queue.snapshot().jobs;
        if jobs.is_empty() {
            self.set_status(StatusLevel::Info, "Nothing to export");
            return;
        }
        match export::write_csv(&self.export_path, &jobs) {
            Ok(()) => self.set_status(
                StatusLevel::Success,
                format!("Exported {} rows to {}", jobs.len(), self.export_path.display()),
            ),
            Err(e) => {
                error!("CSV export failed: {}", e);
                self.set_status(StatusLevel::Error, format!("Export failed: {}", e));
            }
        }
    }

    async fn save_api_key(&mut self) {
        if !self.settings_show_input || self.settings_input.trim().is_empty() {
            return;
        }

        let key = std::mem::take(&mut self.settings_input);
        self.settings.set_api_key(&key);
        self.settings.apply_to(&mut self.config.llm);
        self.settings_show_input = false;

        match self.settings_storage.save(&self.settings).await {
            Ok(()) => {
                info!("API key saved");
                self.set_status(StatusLevel::Success, "API key saved");
            }
            Err(e) => {
                error!("Failed to save settings: {}", e);
                self.set_status(StatusLevel::Error, format!("Failed to save settings: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisResult, EmotionLevel, InferenceError};
    use crate::encoding::FileEncoder;
    use crate::queue::JobStatus;
    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tempfile::TempDir;

    struct CalmClient;

    #[async_trait]
    impl InferenceClient for CalmClient {
        async fn analyze(
            &self,
            _audio: &crate::encoding::EncodedAudio,
        ) -> Result<AnalysisResult, InferenceError> {
            Ok(AnalysisResult {
                emotion_type: "calm".to_string(),
                emotion_level: EmotionLevel::new(2).unwrap(),
                voice_identity: "adult woman".to_string(),
                reasoning: "even pace".to_string(),
            })
        }
    }

    fn app(dir: &TempDir) -> App {
        App::new(
            Config::default(),
            UserSettings::default(),
            SettingsStorage::with_path(dir.path().join("settings")),
            JobQueue::new(),
            Arc::new(FileEncoder::new()),
        )
    }

    fn audio_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"RIFF....WAVE").unwrap();
        path
    }

    fn press(c: char) -> AppAction {
        AppAction::Input(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[tokio::test]
    async fn test_add_file_through_path_input() {
        let dir = TempDir::new().unwrap();
        let path = audio_file(&dir, "voice.wav");
        let mut app = app(&dir);

        app.handle_action(press('a')).await;
        assert!(app.adding_file);
        for c in path.display().to_string().chars() {
            app.handle_action(press(c)).await;
        }
        app.handle_action(AppAction::Submit).await;

        assert!(!app.adding_file);
        assert_eq!(app.state.jobs.len(), 1);
        assert_eq!(app.selected_job().unwrap().name(), "voice.wav");
    }

    #[tokio::test]
    async fn test_missing_file_sets_error_status() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        app.add_file(dir.path().join("absent.wav")).await;
        assert!(app.queue.is_empty());
        assert_eq!(app.status.as_ref().unwrap().level, StatusLevel::Error);
    }

    #[tokio::test]
    async fn test_run_without_key_is_refused() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.add_file(audio_file(&dir, "a.wav")).await;

        app.handle_action(press('r')).await;
        assert!(app.run_handle.is_none());
        assert!(app.status.as_ref().unwrap().text.contains("No API key"));
    }

    #[tokio::test]
    async fn test_run_remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir).with_client(Arc::new(CalmClient));
        app.add_file(audio_file(&dir, "a.wav")).await;

        app.handle_action(press('r')).await;
        let handle = app.run_handle.take().unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.completed, 1);

        app.refresh();
        assert!(matches!(app.state.jobs[0].status, JobStatus::Completed { .. }));

        app.add_file(audio_file(&dir, "b.wav")).await;
        assert_eq!(app.state.jobs.len(), 2);
        app.handle_action(press('d')).await;
        assert_eq!(app.state.jobs.len(), 1);

        app.handle_action(press('c')).await;
        assert!(app.state.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_clear_refused_while_running() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.add_file(audio_file(&dir, "a.wav")).await;

        let queue = app.queue.clone();
        let runner = BatchJobRunner::new(queue.clone(), Arc::new(FileEncoder::new()), Arc::new(CalmClient));
        // Hold the run flag as an active run would
        let (guard, _) = queue.begin_run().unwrap();

        app.handle_action(press('c')).await;
        assert_eq!(app.state.jobs.len(), 1);
        assert_eq!(app.status.as_ref().unwrap().level, StatusLevel::Error);
        assert!(runner.run().await.is_none());

        drop(guard);
        app.handle_action(press('c')).await;
        assert!(app.queue.is_empty());
    }

    #[tokio::test]
    async fn test_export_writes_csv() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.export_path = dir.path().join("out.csv");
        app.add_file(audio_file(&dir, "a.wav")).await;

        app.handle_action(press('x')).await;
        let content = std::fs::read_to_string(&app.export_path).unwrap();
        assert!(content.contains("\"a.wav\""));
    }

    #[tokio::test]
    async fn test_save_api_key_from_settings_view() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);

        app.handle_action(AppAction::ToggleSettings).await;
        app.handle_action(press('e')).await;
        for c in "AIza-secret-9876".chars() {
            app.handle_action(press(c)).await;
        }
        app.handle_action(AppAction::Submit).await;

        assert_eq!(app.config.llm.google_api_key, "AIza-secret-9876");
        assert_eq!(app.provider_status().key_hint.as_deref(), Some("••••9876"));

        let stored = app.settings_storage.load().await.unwrap();
        assert_eq!(stored.google.api_key.as_deref(), Some("AIza-secret-9876"));
    }

    #[tokio::test]
    async fn test_tick_picks_up_published_changes_only() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        let path = audio_file(&dir, "outside.wav");

        // A change made through another handle shows up on the next tick
        let source = AudioSource::from_path(&path).await.unwrap();
        let id = app.queue.clone().push(source);
        assert!(app.state.jobs.is_empty());
        app.handle_action(AppAction::Tick).await;
        assert_eq!(app.state.jobs[0].id, id);

        let version = app.state.version;
        app.handle_action(AppAction::Tick).await;
        assert_eq!(app.state.version, version);

        app.queue.update(id, |job| job.start_processing());
        app.handle_action(AppAction::Tick).await;
        assert_eq!(app.state.jobs[0].status, JobStatus::Processing);
        assert!(app.state.version > version);
    }

    #[tokio::test]
    async fn test_selection_stays_in_bounds() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir);
        app.handle_action(AppAction::SelectNext).await;
        assert_eq!(app.selected, 0);

        app.add_file(audio_file(&dir, "a.wav")).await;
        app.add_file(audio_file(&dir, "b.wav")).await;
        app.handle_action(AppAction::SelectFirst).await;
        app.handle_action(AppAction::SelectNext).await;
        app.handle_action(AppAction::SelectNext).await;
        assert_eq!(app.selected, 1);
        app.handle_action(AppAction::SelectPrev).await;
        assert_eq!(app.selected, 0);
    }
}

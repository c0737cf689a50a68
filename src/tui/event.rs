//! Event Handling
//!
//! Handles keyboard and timer events for the TUI.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::{FutureExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;

/// Actions that can be performed in the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Quit without confirmation
    ForceQuit,
    /// Confirm current input (Enter key)
    Submit,
    ToggleSettings,
    ToggleHelp,
    /// Close modals, cancel input
    Escape,
    SelectPrev,
    SelectNext,
    SelectFirst,
    SelectLast,
    /// Any other key; its meaning depends on the current view and input mode
    Input(KeyEvent),
    /// Timer tick, drives queue refresh
    Tick,
}

/// Queue commands bound to plain keys outside of text input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCommand {
    AddFile,
    Run,
    Remove,
    Clear,
    Export,
    Quit,
}

impl QueueCommand {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if !matches!(key.modifiers, KeyModifiers::NONE | KeyModifiers::SHIFT) {
            return None;
        }
        match key.code {
            KeyCode::Char('a') => Some(Self::AddFile),
            KeyCode::Char('r') => Some(Self::Run),
            KeyCode::Char('d') | KeyCode::Delete => Some(Self::Remove),
            KeyCode::Char('c') => Some(Self::Clear),
            KeyCode::Char('x') => Some(Self::Export),
            KeyCode::Char('q') => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Event handler for the TUI
pub struct EventHandler {
    rx: mpsc::Receiver<AppAction>,
    _tx: mpsc::Sender<AppAction>,
}

impl EventHandler {
    /// Create a new event handler with specified tick rate
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel(100);
        let tx_clone = tx.clone();

        tokio::spawn(async move {
            let mut reader = crossterm::event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                let tick = tick_interval.tick();
                let crossterm_event = reader.next().fuse();

                tokio::select! {
                    _ = tick => {
                        if tx_clone.send(AppAction::Tick).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(evt)) = crossterm_event => {
                        if let Some(action) = Self::map_event(evt) {
                            if tx_clone.send(action).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self { rx, _tx: tx }
    }

    /// Wait for the next action
    pub async fn next(&mut self) -> Option<AppAction> {
        self.rx.recv().await
    }

    fn map_event(event: Event) -> Option<AppAction> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::map_key_event(key),
            _ => None,
        }
    }

    /// Map a key event to an app action
    pub fn map_key_event(key: KeyEvent) -> Option<AppAction> {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(AppAction::ForceQuit),
            (KeyModifiers::CONTROL, KeyCode::Char('s')) => Some(AppAction::ToggleSettings),

            (KeyModifiers::NONE, code) | (KeyModifiers::SHIFT, code) => match code {
                KeyCode::Esc => Some(AppAction::Escape),
                KeyCode::Enter => Some(AppAction::Submit),
                KeyCode::F(1) => Some(AppAction::ToggleHelp),
                KeyCode::Up => Some(AppAction::SelectPrev),
                KeyCode::Down => Some(AppAction::SelectNext),
                KeyCode::Home => Some(AppAction::SelectFirst),
                KeyCode::End => Some(AppAction::SelectLast),
                _ => Some(AppAction::Input(key)),
            },

            _ => Some(AppAction::Input(key)),
        }
    }
}

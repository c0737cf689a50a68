// vox-emotion - batch voice emotion analysis over the Gemini API

pub mod analysis;
pub mod config;
pub mod encoding;
pub mod export;
pub mod llm;
pub mod queue;
pub mod settings; // Encrypted API key storage
pub mod tui; // Terminal User Interface
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use queue::{BatchJobRunner, JobQueue, RunSummary};

// Logger initialization
// CLI runs log to stderr; the TUI owns the terminal, so it logs to a daily file.

use crate::config::LoggingConfig;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "vox-emotion.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Cli,
    Tui,
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("vox_emotion=info"))
}

/// Install the global subscriber.
///
/// In TUI mode the returned guard must live until exit or buffered lines are lost.
pub fn init_logger(mode: LogMode, config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = build_env_filter(config);

    match mode {
        LogMode::Cli => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
            Ok(None)
        }
        LogMode::Tui => {
            std::fs::create_dir_all(&config.log_dir)?;
            let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;

            info!(dir = %config.log_dir.display(), "File logging initialized");
            Ok(Some(guard))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_bad_filter_falls_back() {
        let config = LoggingConfig {
            filter: "vox_emotion=loudest".to_string(),
            log_dir: PathBuf::from("."),
        };
        assert_eq!(build_env_filter(&config).to_string(), "vox_emotion=info");
    }
}

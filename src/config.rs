use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::llm::google::models;
use crate::utils::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub llm: LLMConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub google_api_key: String,
    pub model: String,
    pub api_base: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            google_api_key: String::new(),
            model: models::DEFAULT_AUDIO.to_string(),
            api_base: None,
        }
    }
}

impl LLMConfig {
    pub fn has_api_key(&self) -> bool {
        !self.google_api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    pub inter_job_delay_ms: u64,
    pub backoff_step_ms: u64,
    pub max_retries: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_job_delay_ms: 1500,
            backoff_step_ms: 5000,
            max_retries: 2,
        }
    }
}

impl BatchConfig {
    pub fn inter_job_delay(&self) -> Duration {
        Duration::from_millis(self.inter_job_delay_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_step: Duration::from_millis(self.backoff_step_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "vox_emotion=info".to_string(),
            log_dir: default_log_dir(),
        }
    }
}

/// Default directory for TUI log files
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vox-emotion")
        .join("logs")
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_value(name, env::var(name).ok().as_deref(), default)
}

/// Blank or missing values fall back to the default
fn parse_value<T>(name: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, value)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        Ok(Self {
            llm: LLMConfig {
                provider: env::var("VOX_PROVIDER").unwrap_or(defaults.llm.provider),
                google_api_key: env::var("GOOGLE_API_KEY")
                    .or_else(|_| env::var("GEMINI_API_KEY"))
                    .unwrap_or_default(),
                model: env::var("VOX_MODEL").unwrap_or(defaults.llm.model),
                api_base: env::var("VOX_API_BASE").ok().filter(|s| !s.is_empty()),
            },
            batch: BatchConfig {
                inter_job_delay_ms: parse_var("VOX_INTER_JOB_DELAY_MS", defaults.batch.inter_job_delay_ms)?,
                backoff_step_ms: parse_var("VOX_BACKOFF_STEP_MS", defaults.batch.backoff_step_ms)?,
                max_retries: parse_var("VOX_MAX_RETRIES", defaults.batch.max_retries)?,
            },
            logging: LoggingConfig {
                filter: env::var("RUST_LOG").unwrap_or(defaults.logging.filter),
                log_dir: env::var("VOX_LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.logging.log_dir),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_defaults() {
        let batch = BatchConfig::default();
        assert_eq!(batch.inter_job_delay(), Duration::from_millis(1500));

        let policy = batch.retry_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff_step, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_value_default_and_error() {
        assert_eq!(parse_value("VOX_MAX_RETRIES", None, 7u32).unwrap(), 7);
        assert_eq!(parse_value("VOX_MAX_RETRIES", Some("  "), 7u32).unwrap(), 7);
        assert_eq!(parse_value("VOX_MAX_RETRIES", Some(" 4 "), 7u32).unwrap(), 4);

        let err = parse_value("VOX_MAX_RETRIES", Some("seven"), 7u32).unwrap_err();
        assert!(err.to_string().contains("VOX_MAX_RETRIES"));
    }

    #[test]
    fn test_default_config_needs_no_environment() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "google");
        assert_eq!(config.llm.model, models::DEFAULT_AUDIO);
        assert!(!config.llm.has_api_key());
        assert_eq!(config.batch.max_retries, 2);
        assert_eq!(config.logging.filter, "vox_emotion=info");
    }

    #[test]
    fn test_has_api_key() {
        let mut llm = LLMConfig {
            google_api_key: "  ".to_string(),
            ..LLMConfig::default()
        };
        assert!(!llm.has_api_key());
        llm.google_api_key = "abc".to_string();
        assert!(llm.has_api_key());
    }
}

//! Emotion Analysis
//!
//! The inference side of the batch pipeline:
//!
//! - [`InferenceClient`]: payload in, [`AnalysisResult`] or a classified failure out
//! - [`EmotionAnalyzer`]: the Gemini-backed implementation
//! - [`is_rate_limit_message`]: the single throttling predicate

pub mod emotion;
pub mod result;

pub use emotion::EmotionAnalyzer;
pub use result::{AnalysisResult, EmotionLevel, ParseError};

use crate::encoding::EncodedAudio;
use crate::types::AppError;
use async_trait::async_trait;
use thiserror::Error;

/// Failure of one inference attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// The service is throttling us; the attempt may be retried
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Anything else: transport, service error, malformed response
    #[error("{0}")]
    Failed(String),
}

impl InferenceError {
    /// Classify a bare error message
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_rate_limit_message(&message) {
            InferenceError::RateLimited(message)
        } else {
            InferenceError::Failed(message)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, InferenceError::RateLimited(_))
    }
}

impl From<AppError> for InferenceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::RateLimited(message) => InferenceError::RateLimited(message),
            other => InferenceError::from_message(other.to_string()),
        }
    }
}

impl From<ParseError> for InferenceError {
    fn from(err: ParseError) -> Self {
        // A malformed answer is never throttling, whatever its text says
        InferenceError::Failed(format!("Unparseable analysis: {}", err))
    }
}

/// Whether an error message signals throttling.
///
/// Substring matching is the only signal some transports give us; callers
/// with a structured status should map it to `RateLimited` directly.
pub fn is_rate_limit_message(message: &str) -> bool {
    message.contains("429") || message.contains("RESOURCE_EXHAUSTED")
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn analyze(&self, audio: &EncodedAudio) -> Result<AnalysisResult, InferenceError>;
}

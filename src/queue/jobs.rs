// Job definitions for the analysis queue

use crate::analysis::AnalysisResult;
use crate::encoding::AudioSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// User-facing failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Generic,
}

impl FailureKind {
    pub fn user_message(self) -> &'static str {
        match self {
            FailureKind::RateLimited => "frequency exceeded",
            FailureKind::Generic => "analysis failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: FailureKind,
    /// Attempts made before giving up
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Processing,
    Completed { result: AnalysisResult },
    Failed { error: JobError },
}

impl JobStatus {
    /// Idle and Failed jobs are picked up by the next run
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Idle | JobStatus::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Idle => "Idle",
            JobStatus::Processing => "Processing",
            JobStatus::Completed { .. } => "Completed",
            JobStatus::Failed { .. } => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub source: AudioSource,
    pub status: JobStatus,
    pub added_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(source: AudioSource) -> Self {
        Self {
            id: JobId::new(),
            source,
            status: JobStatus::Idle,
            added_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.status {
            JobStatus::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match &self.status {
            JobStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn start_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.finished_at = None;
    }

    /// Back to Idle after an abandoned run
    pub fn reset(&mut self) {
        self.status = JobStatus::Idle;
        self.finished_at = None;
    }

    pub fn complete(&mut self, result: AnalysisResult) {
        self.status = JobStatus::Completed { result };
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: JobError) {
        self.status = JobStatus::Failed { error };
        self.finished_at = Some(Utc::now());
    }
}

//! Batch Job Runner
//!
//! Walks the pending jobs of a [`JobQueue`] one at a time:
//!
//! ```text
//! begin_run ──► for each Idle/Failed job (captured at start)
//!                 │
//!                 ├─ Processing
//!                 ├─ encode ──(error)──────────────────────► Failed (generic)
//!                 ├─ infer ◄─┐
//!                 │    │     └─ rate limited, attempts left: sleep k × step
//!                 │    ├─ ok ─────────────────────────────► Completed
//!                 │    └─ other / out of attempts ────────► Failed
//!                 └─ sleep inter-job delay (only if a later job is still queued)
//! ```
//!
//! A job's failure never stops the batch.

use super::jobs::{FailureKind, JobError, JobId};
use super::store::JobQueue;
use crate::analysis::{AnalysisResult, InferenceClient, InferenceError};
use crate::config::BatchConfig;
use crate::encoding::{AudioSource, Encoder};
use crate::utils::retry::{with_retry, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const DEFAULT_INTER_JOB_DELAY: Duration = Duration::from_millis(1500);

/// What one run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Size of the working set at run start
    pub selected: usize,
    pub completed: usize,
    pub failed: usize,
    /// Removed from the queue before or during processing
    pub skipped: usize,
}

pub struct BatchJobRunner {
    queue: JobQueue,
    encoder: Arc<dyn Encoder>,
    client: Arc<dyn InferenceClient>,
    policy: RetryPolicy,
    inter_job_delay: Duration,
}

impl BatchJobRunner {
    pub fn new(queue: JobQueue, encoder: Arc<dyn Encoder>, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            queue,
            encoder,
            client,
            policy: RetryPolicy::default(),
            inter_job_delay: DEFAULT_INTER_JOB_DELAY,
        }
    }

    pub fn from_config(
        queue: JobQueue,
        encoder: Arc<dyn Encoder>,
        client: Arc<dyn InferenceClient>,
        config: &BatchConfig,
    ) -> Self {
        Self::new(queue, encoder, client)
            .with_policy(config.retry_policy())
            .with_inter_job_delay(config.inter_job_delay())
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }

    /// Run every Idle or Failed job to a terminal state.
    ///
    /// Returns `None` without touching the queue if a run is already active.
    pub async fn run(&self) -> Option<RunSummary> {
        let Some((mut guard, working_set)) = self.queue.begin_run() else {
            debug!("Run already active, ignoring start request");
            return None;
        };

        let total = working_set.len();
        let mut summary = RunSummary {
            selected: total,
            ..RunSummary::default()
        };
        info!(jobs = total, "Batch run started");

        for (index, (id, source)) in working_set.iter().enumerate() {
            if !guard.start(*id) {
                info!(job_id = %id, file = %source.name, "Job removed before its turn, skipping");
                summary.skipped += 1;
                continue;
            }

            let outcome = self.process(*id, source).await;
            if let Ok(result) = &outcome {
                info!(
                    job_id = %id,
                    file = %source.name,
                    emotion = %result.emotion_type,
                    level = result.emotion_level.get(),
                    "Job completed"
                );
            }

            let succeeded = outcome.is_ok();
            let written = guard.finish(*id, |job| match outcome {
                Ok(result) => job.complete(result),
                Err(error) => job.fail(error),
            });
            match (written, succeeded) {
                (false, _) => {
                    debug!(job_id = %id, "Job removed while processing, outcome dropped");
                    summary.skipped += 1;
                }
                (true, true) => summary.completed += 1,
                (true, false) => summary.failed += 1,
            }

            let rest = &working_set[index + 1..];
            if rest.iter().any(|(next, _)| self.queue.contains(*next)) {
                sleep(self.inter_job_delay).await;
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Batch run finished"
        );
        Some(summary)
    }

    /// Start a run on a background task
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Option<RunSummary>> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.run().await })
    }

    async fn process(&self, id: JobId, source: &AudioSource) -> Result<AnalysisResult, JobError> {
        let encoded = match self.encoder.encode(source).await {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(job_id = %id, file = %source.name, error = %e, "Encoding failed");
                return Err(JobError {
                    kind: FailureKind::Generic,
                    attempts: 0,
                });
            }
        };

        let outcome = with_retry(&self.policy, InferenceError::is_rate_limited, |attempt| {
            debug!(job_id = %id, attempt, "Calling inference");
            self.client.analyze(&encoded)
        })
        .await;

        outcome.result.map_err(|e| {
            let kind = if e.is_rate_limited() {
                FailureKind::RateLimited
            } else {
                FailureKind::Generic
            };
            warn!(
                job_id = %id,
                file = %source.name,
                attempts = outcome.attempts,
                kind = ?kind,
                error = %e,
                "Analysis failed"
            );
            JobError {
                kind,
                attempts: outcome.attempts,
            }
        })
    }
}

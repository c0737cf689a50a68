//! Analysis queue: job records, the shared store and the batch runner

pub mod jobs;
pub mod runner;
pub mod store;

pub use jobs::{FailureKind, Job, JobError, JobId, JobStatus};
pub use runner::{BatchJobRunner, RunSummary, DEFAULT_INTER_JOB_DELAY};
pub use store::{JobQueue, QueueCounts, QueueState};

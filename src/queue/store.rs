//! Job Queue Store
//!
//! The queue is the only shared mutable state in the pipeline. It lives in a
//! `tokio::sync::watch` channel: every mutation goes through the sender, bumps
//! `version` and wakes subscribers, so a presentation layer can follow the
//! run without the runner knowing anything about rendering.

use super::jobs::{Job, JobId, JobStatus};
use crate::encoding::AudioSource;
use crate::types::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A point-in-time view of the queue
#[derive(Debug, Clone, Default)]
pub struct QueueState {
    /// Insertion order
    pub jobs: Vec<Job>,
    pub running: bool,
    /// Incremented on every mutation
    pub version: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub idle: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.idle + self.processing + self.completed + self.failed
    }
}

impl QueueState {
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn counts(&self) -> QueueCounts {
        self.jobs.iter().fold(QueueCounts::default(), |mut acc, job| {
            match job.status {
                JobStatus::Idle => acc.idle += 1,
                JobStatus::Processing => acc.processing += 1,
                JobStatus::Completed { .. } => acc.completed += 1,
                JobStatus::Failed { .. } => acc.failed += 1,
            }
            acc
        })
    }

    pub fn pending_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.status.is_pending()).count()
    }
}

/// Cloneable handle to the shared queue
#[derive(Clone)]
pub struct JobQueue {
    tx: Arc<watch::Sender<QueueState>>,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(QueueState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Receive every published state
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> QueueState {
        self.tx.borrow().clone()
    }

    /// Read the current state without cloning it
    pub fn with_state<R>(&self, f: impl FnOnce(&QueueState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn is_running(&self) -> bool {
        self.tx.borrow().running
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a new Idle job
    pub fn push(&self, source: AudioSource) -> JobId {
        let job = Job::new(source);
        let id = job.id;
        debug!(job_id = %id, file = %job.source.name, "Job queued");

        self.tx.send_modify(|state| {
            state.jobs.push(job);
            state.version += 1;
        });
        id
    }

    /// Remove one job. Allowed during a run.
    pub fn remove(&self, id: JobId) -> Option<Job> {
        let mut removed = None;
        self.tx.send_if_modified(|state| {
            match state.jobs.iter().position(|j| j.id == id) {
                Some(index) => {
                    removed = Some(state.jobs.remove(index));
                    state.version += 1;
                    true
                }
                None => false,
            }
        });
        removed
    }

    /// Remove every job. Refused while a run is active.
    pub fn clear(&self) -> AppResult<usize> {
        let mut outcome = Ok(0);
        self.tx.send_if_modified(|state| {
            if state.running {
                outcome = Err(AppError::RunActive);
                return false;
            }
            let count = state.jobs.len();
            state.jobs.clear();
            state.version += 1;
            outcome = Ok(count);
            true
        });

        if let Ok(count) = outcome {
            info!(count, "Queue cleared");
        }
        outcome
    }

    /// Mutate one job in place; returns false if it is no longer queued
    pub fn update(&self, id: JobId, f: impl FnOnce(&mut Job)) -> bool {
        self.tx.send_if_modified(|state| match state.jobs.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                f(job);
                state.version += 1;
                true
            }
            None => false,
        })
    }

    /// Atomically claim the run flag and capture the working set.
    ///
    /// Returns `None` when a run is already active.
    pub(crate) fn begin_run(&self) -> Option<(RunGuard, Vec<(JobId, AudioSource)>)> {
        let mut working_set = None;
        self.tx.send_if_modified(|state| {
            if state.running {
                return false;
            }
            state.running = true;
            state.version += 1;
            working_set = Some(
                state
                    .jobs
                    .iter()
                    .filter(|j| j.status.is_pending())
                    .map(|j| (j.id, j.source.clone()))
                    .collect::<Vec<_>>(),
            );
            true
        });

        working_set.map(|set| {
            let guard = RunGuard {
                queue: self.clone(),
                in_flight: None,
            };
            (guard, set)
        })
    }

    pub(crate) fn contains(&self, id: JobId) -> bool {
        self.with_state(|state| state.get(id).is_some())
    }

    /// Release the run flag. A job left in Processing goes back to Idle.
    fn end_run(&self, in_flight: Option<JobId>) {
        self.tx.send_modify(|state| {
            if let Some(job) = in_flight.and_then(|id| state.jobs.iter_mut().find(|j| j.id == id)) {
                if job.status == JobStatus::Processing {
                    warn!(job_id = %job.id, file = %job.source.name, "Run abandoned mid-job, job reset to Idle");
                    job.reset();
                }
            }
            state.running = false;
            state.version += 1;
        });
    }
}

/// Holds the run flag for one run.
///
/// Dropping it, including when the run future is cancelled, releases the flag
/// and returns the in-flight job to the pending set.
pub(crate) struct RunGuard {
    queue: JobQueue,
    in_flight: Option<JobId>,
}

impl RunGuard {
    /// Mark a job Processing; false if it was removed
    pub(crate) fn start(&mut self, id: JobId) -> bool {
        let started = self.queue.update(id, Job::start_processing);
        if started {
            self.in_flight = Some(id);
        }
        started
    }

    /// Write the outcome back; false if the job was removed meanwhile
    pub(crate) fn finish(&mut self, id: JobId, f: impl FnOnce(&mut Job)) -> bool {
        self.in_flight = None;
        self.queue.update(id, f)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.queue.end_run(self.in_flight.take());
    }
}

// Retry utilities
// Linear, attempt-indexed backoff: after attempt k fails, wait k * step.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries on top of the first attempt
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_step: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Wait before the attempt following `attempt` (1-based). No jitter.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Outcome of [`with_retry`]: the final result and how many attempts it took
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the policy's attempts are used up.
///
/// `operation` receives the 1-based attempt number.
pub async fn with_retry<F, Fut, T, E, R>(
    policy: &RetryPolicy,
    mut is_retryable: R,
    mut operation: F,
) -> Retried<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(error) => {
                if attempt >= policy.max_attempts() || !is_retryable(&error) {
                    return Retried {
                        result: Err(error),
                        attempts: attempt,
                    };
                }

                let delay = policy.backoff_after(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "Retrying after backoff");
                sleep(delay).await;
            }
        }
    }
}

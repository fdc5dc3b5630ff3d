//! Bounded retry with fixed backoff and an overall deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, warn};

/// Retry settings shared by every upstream call that is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
    /// Budget for all attempts together
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(1000),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The operation failed with an error that must not be retried.
    Rejected(E),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// The deadline passed before an attempt succeeded.
    DeadlineExceeded { attempts: u32 },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            timeout,
        }
    }

    /// Budget for a single attempt.
    ///
    /// The overall timeout is split into `max_attempts + 1` slices so that one
    /// extra call (a fallback) still fits after every attempt timed out.
    pub fn attempt_timeout(&self) -> Duration {
        self.timeout / (self.max_attempts.max(1) + 1)
    }

    /// Deadline for an operation starting now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts or hits `deadline`. Each attempt is cut off at the deadline.
    pub async fn run_until<T, E, F, Fut, R>(
        &self,
        deadline: Instant,
        is_retryable: R,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if Instant::now() >= deadline {
                return Err(RetryError::DeadlineExceeded { attempts: attempt });
            }
            attempt += 1;

            let error = match timeout_at(deadline, op(attempt)).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!("Succeeded after {} attempts", attempt);
                    }
                    return Ok(value);
                }
                Ok(Err(error)) => error,
                Err(_) => return Err(RetryError::DeadlineExceeded { attempts: attempt }),
            };

            if !is_retryable(&error) {
                return Err(RetryError::Rejected(error));
            }
            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let resume_at = Instant::now() + self.backoff;
            if resume_at >= deadline {
                warn!(
                    attempt,
                    error = %error,
                    "Backoff would pass the deadline, giving up"
                );
                return Err(RetryError::DeadlineExceeded { attempts: attempt });
            }
            warn!(
                attempt,
                max_attempts,
                backoff_ms = self.backoff.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying"
            );
            sleep_until(resume_at).await;
        }
    }

    /// [`RetryPolicy::run_until`] with a deadline of now plus `timeout`.
    pub async fn run<T, E, F, Fut, R>(&self, is_retryable: R, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        self.run_until(self.deadline(), is_retryable, op).await
    }
}

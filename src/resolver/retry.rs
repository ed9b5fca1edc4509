//! Bounded retry with per-attempt timeout and linear backoff.

use crate::error::ResolutionError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to try, how long each try may take, and how long to wait
/// between tries (`attempt * backoff_step`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(15),
            backoff_step: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempts run out.
///
/// An attempt that exceeds the timeout is dropped and counts as
/// [`ResolutionError::Timeout`]; `on_timeout` runs before the next attempt.
pub async fn retry_with_backoff<T, F, Fut, C>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
    mut on_timeout: C,
) -> Result<T, ResolutionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ResolutionError>>,
    C: FnMut(),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let error = match tokio::time::timeout(policy.attempt_timeout, operation(attempt)).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => {
                on_timeout();
                ResolutionError::Timeout(policy.attempt_timeout)
            }
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if attempt >= max_attempts {
            warn!(
                operation = operation_name,
                attempt,
                error = %error,
                "Operation failed after all retries"
            );
            return Err(error);
        }

        let delay = policy.delay_after(attempt);
        warn!(
            operation = operation_name,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Operation failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

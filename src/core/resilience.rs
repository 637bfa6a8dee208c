use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::core::errors::AdtError;

/// Upper bound for a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Bounded exponential backoff for connection-level failures
///
/// Policy:
/// - Only idempotent requests are retried
/// - At most `max_retries` additional attempts
/// - Delays grow exponentially from `initial_backoff`, capped at 5 seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(0, Duration::from_millis(1))
    }

    /// Delay schedule, one entry per permitted retry
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let start = self.initial_backoff;
        (0..self.max_retries)
            .map(move |i| start.saturating_mul(2u32.saturating_pow(i)).min(MAX_BACKOFF))
    }
}

/// Run `operation`, retrying transient failures of idempotent requests
///
/// Non-idempotent requests are attempted exactly once so a lost response
/// never turns into a duplicate side effect on the backend.
pub async fn retry_transient<F, Fut, T>(
    policy: &RetryPolicy,
    idempotent: bool,
    label: &str,
    mut operation: F,
) -> Result<T, AdtError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdtError>>,
{
    let mut delays = policy.delays();
    let mut attempt: u32 = 1;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if idempotent && err.is_transient() => err,
            Err(err) => return Err(err),
        };

        let Some(delay) = delays.next() else {
            return Err(err);
        };
        warn!(
            request = %label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transport failure on idempotent request, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::{MatchError, Result};

/// Timeout and exponential backoff applied to every provider, explainer and index call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first call
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Maximum jitter as a fraction of the computed delay (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Per-attempt deadline
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy without waits between attempts. Used by tests and in-process fakes.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_factor: 0.0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based), jitter included and capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let exponential_ms = (base_ms * self.backoff_multiplier.powi(retry as i32)).min(max_ms);

        let jitter_ms = if self.jitter_factor > 0.0 && exponential_ms > 0.0 {
            let range = exponential_ms * self.jitter_factor.min(1.0);
            rand::thread_rng().gen_range(0.0..=range)
        } else {
            0.0
        };

        Duration::from_millis((exponential_ms + jitter_ms).min(max_ms).max(0.0) as u64)
    }
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or attempts run out.
///
/// Each attempt is bounded by `policy.timeout`; an expired deadline counts as a
/// [`MatchError::Timeout`] and is retried like any other transient failure.
pub async fn retry_with_backoff<T, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match timeout(policy.timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(MatchError::Timeout(format!(
                "{operation} exceeded {}ms",
                policy.timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt - 1);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure; retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    warn!(operation, attempts = attempt, error = %err, "retries exhausted");
                }
                return Err(err);
            }
        }
    }
}

//! Retry policy and the generic attempt loop.
//!
//! The policy only describes timing. [`retry`] drives any async operation
//! with it and asks the caller which errors are worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Exponential backoff with bounded random jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    ///
    /// Default: `3`
    pub max_attempts: u32,

    /// Delay before the second attempt.
    ///
    /// Default: 600 ms
    pub base_delay: Duration,

    /// Growth factor between consecutive delays.
    ///
    /// Default: `1.8`
    pub multiplier: f64,

    /// Upper bound of the random extra delay, as a fraction of the computed delay.
    ///
    /// Default: `0.3`
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(600),
            multiplier: 1.8,
            jitter: 0.3,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the `failed_attempt`-th failure (1-based), without jitter.
    #[must_use]
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Delay after the `failed_attempt`-th failure, jitter included.
    #[must_use]
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let delay = self.backoff(failed_attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter <= 0.0 {
            return delay;
        }
        let extra = (delay.as_millis() as f64 * fastrand::f64() * jitter).round() as u64;
        delay + Duration::from_millis(extra)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. `op` receives the 1-based attempt number.
///
/// The last error is returned when every attempt fails.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                let delay = policy.delay_for(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if attempt > 1 {
                    warn!(attempts = attempt, error = %err, "giving up");
                }
                return Err(err);
            }
        }
    }
}

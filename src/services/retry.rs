/// Exponential backoff with jitter for outbound catalog calls.
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::CatalogError;

/// Retry policy for idempotent upstream reads
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: usize,
    pub base_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Wait before retry number `attempt` (1-based); zero for the first call
    ///
    /// `base * 2^(attempt-1)` plus up to half of that in random jitter,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;

        let factor = 1_u64.checked_shl((attempt - 1) as u32).unwrap_or(u64::MAX);
        let exponential = base_ms.saturating_mul(factor);
        let capped = exponential.min(max_ms);

        let jitter = if capped > 1 {
            rand::rng().random_range(0..=capped / 2)
        } else {
            0
        };

        Duration::from_millis(capped.saturating_add(jitter).min(max_ms))
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, endpoint: &str, mut operation: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient catalog failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

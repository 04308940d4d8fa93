use anyhow::{Context, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Exponential backoff policy shared by the request layer and ad-hoc
/// retried operations.
///
/// The delay before attempt `k` (0-indexed) is `base_delay_ms * 2^k`,
/// capped at `max_delay_ms`. Jitter widens the delay to 0.5x..=1.5x so
/// many accounts sharing a relative clock do not retry in lockstep.
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff delay to sleep after a failed attempt `attempt` (0-indexed).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.min(63) as i32);
        let delay_ms = (self.base_delay_ms as f64 * exp).min(self.max_delay_ms as f64);

        let delay_ms = if self.jitter {
            let factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Runs `operation` up to `config.max_attempts` times, sleeping the
/// configured backoff between failures. The final failure is returned
/// with the operation name and attempt count attached.
pub async fn with_retry<T, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    for attempt in 0..attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt + 1 == attempts {
                    let error_msg = format!("{}", e);
                    return Err(e).context(format!(
                        "{} failed after {} attempts. Last error: {}",
                        operation_name, attempts, error_msg
                    ));
                }

                let delay = config.delay_before(attempt);
                debug!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name,
                    attempt + 1,
                    attempts,
                    delay,
                    e
                );

                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!()
}

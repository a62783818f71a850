//! Bounded retry of conflicting units of work
//!
//! Each attempt runs under a deadline. An attempt that times out is dropped
//! together with its unit of work, which rolls it back. Only
//! `SignupError::ConcurrencyConflict` is retried; once the retries are spent
//! the conflict surfaces as `SignupError::Internal`.

use std::future::Future;
use std::time::Duration;
use rand::Rng;
use tracing::error;
use crate::config::EngineConfig;
use crate::utils::errors::{Result, SignupError};
use crate::utils::logging::log_retry;

const MAX_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl From<&EngineConfig> for RetryPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay(),
            attempt_timeout: config.transaction_timeout(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl RetryPolicy {
    /// Exponential backoff with jitter for the `retry`-th retry (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent).min(MAX_BACKOFF);
        let jitter_ms = self.base_delay.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        delay + jitter
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, attempt()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SignupError::Timeout {
                    timeout_ms: self.attempt_timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Err(e) if e.is_retryable() => {
                    if retries >= self.max_retries {
                        error!(operation = operation, retries = retries, error = %e, "Giving up after repeated conflicts");
                        return Err(SignupError::Internal(format!(
                            "{} failed after {} retries: {}",
                            operation, retries, e
                        )));
                    }
                    retries += 1;
                    log_retry(operation, retries, self.max_retries, &e.to_string());
                    tokio::time::sleep(self.backoff(retries)).await;
                }
                other => return other,
            }
        }
    }
}

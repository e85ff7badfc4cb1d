//! Bounded retry with exponential backoff for rate-limited calls.
//!
//! Airtable signals rate limiting with HTTP 429; the only automatic
//! retry in this system is a short bounded backoff on that status.
//! Every other failure is reported to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};

/// Retry strategy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Config for rate limiting (short delays, no jitter so tests are
    /// deterministic about timing bounds).
    pub fn rate_limit() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.5,
            add_jitter: false,
        }
    }

    /// Calculates delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.add_jitter {
            // Add up to 25% jitter
            let jitter = rand::random::<f64>() * 0.25 * capped_delay;
            capped_delay + jitter
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Runs `op`, retrying on rate-limit errors with backoff.
///
/// Non-rate-limit errors are returned immediately. When every attempt
/// hits the rate limit, `AppError::RetriesExhausted` is returned.
pub async fn retry_on_rate_limit<T, F, Fut>(config: &RetryConfig, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limit() && attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                log::warn!(
                    "Rate limited (attempt {}/{}), backing off for {:?}",
                    attempt + 1,
                    config.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_rate_limit() => {
                return Err(AppError::RetriesExhausted {
                    attempts: attempt + 1,
                })
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> AppError {
        AppError::Airtable {
            status: 429,
            message: "rate limited".to_string(),
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            backoff_multiplier: 2.0,
            add_jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        // Capped at max_delay
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_succeeds_after_rate_limits() {
        let config = RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 1.0,
            add_jitter: false,
        };
        let calls = AtomicU32::new(0);

        let result = retry_on_rate_limit(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_on_persistent_rate_limit() {
        let config = RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 1.0,
            add_jitter: false,
        };
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = retry_on_rate_limit(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

        assert!(matches!(result, Err(AppError::RetriesExhausted { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: AppResult<()> = retry_on_rate_limit(&RetryConfig::rate_limit(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AppError::Airtable {
                    status: 500,
                    message: "boom".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(AppError::Airtable { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

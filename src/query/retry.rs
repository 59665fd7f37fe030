//! Retry configuration and delay calculation for cache fetches.
//!
//! Only reads are retried. Mutations run exactly once and leave the retry
//! decision to the caller. Errors that are not retryable (see
//! [`AdminError::is_retryable()`]) are returned immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::telemetry;
use crate::{AdminError, Result};

/// Configuration for retrying failed fetches.
///
/// Uses exponential backoff:
///
/// ```rust
/// # use docbox_admin::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// assert_eq!(config.delay_for_attempt(1), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 4.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 1s.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Run `f` until it succeeds, fails permanently, or runs out of attempts.
pub(crate) async fn with_retry<F, Fut, T>(config: &RetryConfig, key: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts.max(1) {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::QUERY_RETRIES_TOTAL).increment(1);
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        key,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying fetch after error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(AdminError::Unclassified(None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorBody;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::new()
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(2))
    }

    #[test]
    fn backoff_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(), "k", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AdminError::from_status(503, ErrorBody::Empty))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn excluded_statuses_fail_immediately() {
        for status in [400, 401, 403, 404] {
            let calls = AtomicU32::new(0);
            let result: Result<()> = with_retry(&fast(), "k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AdminError::from_status(status, ErrorBody::Empty))
            })
            .await;
            assert!(result.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 1, "status {status}");
        }
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast().max_attempts(2), "k", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AdminError::Unreachable("refused".into()))
        })
        .await;
        assert!(matches!(result, Err(AdminError::Unreachable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_makes_one_attempt() {
        let calls = AtomicU32::new(0);
        let _: Result<()> = with_retry(&RetryConfig::disabled(), "k", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AdminError::Unreachable("refused".into()))
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

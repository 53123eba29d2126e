//! Bounded retry with exponential backoff
//!
//! Transient failures (rate limits) are retried a fixed number of times with a
//! doubling delay. When the attempts run out the caller gets
//! [`TpubError::RetryExhausted`] instead of an endless wait.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::{Result, TpubError};

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Image generation quotas reset per minute.
        Self {
            max_attempts: 4,
            initial_backoff_ms: 15_000,
            max_backoff_ms: 120_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms: initial_backoff.as_millis() as u64,
            max_backoff_ms: max_backoff.as_millis() as u64,
        }
    }

    /// Retry immediately, useful in tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before attempt `attempt + 1` (attempts are 1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Run `f` until it succeeds, fails permanently, or the policy runs out
///
/// `f` receives the 1-based attempt number. Only errors for which
/// [`TpubError::is_retryable`] holds are retried.
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match f(attempt).await {
            Ok(val) => return Ok(val),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt == max_attempts {
                    warn!(
                        "{} failed after {} attempts: {}",
                        operation_name, max_attempts, e
                    );
                    return Err(TpubError::RetryExhausted {
                        attempts: max_attempts,
                        last_error: e.to_string(),
                    });
                }

                let delay = policy.backoff_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    operation_name, attempt, max_attempts, e, delay
                );
                crate::config::settle(delay).await;
            }
        }
    }

    unreachable!("retry loop always returns")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_secs(10), Duration::from_secs(35));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(10));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(20));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(35));
        assert_eq!(policy.backoff_for(30), Duration::from_secs(35));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_success_after_rate_limit() {
        let mut calls = 0;
        let result = retry_with_backoff("op", &RetryPolicy::immediate(3), |attempt| {
            calls += 1;
            async move {
                if attempt < 2 {
                    Err(TpubError::RateLimited("429".to_string()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_retry_exhausted() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff("op", &RetryPolicy::immediate(3), |_| {
            calls += 1;
            async { Err(TpubError::RateLimited("quota".to_string())) }
        })
        .await;

        assert_eq!(calls, 3);
        match result.unwrap_err() {
            TpubError::RetryExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("quota"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<()> = retry_with_backoff("op", &RetryPolicy::immediate(5), |_| {
            calls += 1;
            async { Err(TpubError::Api("400 bad request".to_string())) }
        })
        .await;

        assert_eq!(calls, 1);
        assert!(matches!(result.unwrap_err(), TpubError::Api(_)));
    }
}

//! Circuit breaker for the Gemini API
//!
//! Repeated hard failures (bad key, quota disabled, server errors) stop further
//! requests for a cool-down period instead of burning every remaining image
//! prompt on the same error.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests allowed
    Closed,
    /// Requests rejected until the cool-down elapses
    Open,
    /// Cool-down elapsed, one trial request is let through
    HalfOpen,
}

/// Counts consecutive failures and opens after `threshold` of them
///
/// ```
/// use tpub_gemini::CircuitBreaker;
///
/// let breaker = CircuitBreaker::new(2, 60);
/// breaker.record_failure();
/// breaker.record_failure();
/// assert!(!breaker.can_execute());
/// ```
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    last_failure_ms: AtomicU64,
    threshold: u32,
    cool_down: Duration,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cool_down_secs: u64) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(0),
            threshold: threshold.max(1),
            cool_down: Duration::from_secs(cool_down_secs),
        }
    }

    fn elapsed_since_failure(&self) -> u64 {
        now_millis().saturating_sub(self.last_failure_ms.load(Ordering::Relaxed))
    }

    pub fn state(&self) -> CircuitState {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            CircuitState::Closed
        } else if self.elapsed_since_failure() >= self.cool_down.as_millis() as u64 {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.last_failure_ms.store(now_millis(), Ordering::Relaxed);
    }

    pub fn can_execute(&self) -> bool {
        self.state() != CircuitState::Open
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Remaining cool-down, zero unless open
    pub fn time_until_retry(&self) -> Duration {
        match self.state() {
            CircuitState::Open => Duration::from_millis(
                (self.cool_down.as_millis() as u64).saturating_sub(self.elapsed_since_failure()),
            ),
            _ => Duration::ZERO,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_closed() {
        let breaker = CircuitBreaker::default();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.can_execute());
        assert_eq!(breaker.time_until_retry(), Duration::ZERO);
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new(3, 60);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());

        let remaining = breaker.time_until_retry();
        assert!(remaining > Duration::ZERO);
        assert!(remaining <= Duration::from_secs(60));
    }

    #[test]
    fn test_success_closes() {
        let breaker = CircuitBreaker::new(2, 60);
        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.can_execute());

        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);
        assert!(breaker.can_execute());
    }

    #[test]
    fn test_zero_cool_down_goes_half_open() {
        let breaker = CircuitBreaker::new(1, 0);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.can_execute());
    }
}

//! Retry and circuit-breaker helpers for phase handlers.
//!
//! The executor never retries; handlers wrap their own external calls with
//! these.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use retry::{guarded_call, retry_async};

use std::time::Duration;

/// Retry strategy plugin
pub trait RetryStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;
    /// Wait before retrying; `attempt` is the 0-based index of the attempt that failed.
    fn next_delay(&self, attempt: u32, error: &str) -> Option<Duration>;
    fn max_attempts(&self) -> u32;
    fn should_retry(&self, attempt: u32, error: &str) -> bool {
        attempt < self.max_attempts() && !self.is_fatal_error(error)
    }
    fn is_fatal_error(&self, _error: &str) -> bool {
        false
    }
}

/// Strategy that never retries.
pub struct NoRetry;

impl RetryStrategyPlugin for NoRetry {
    fn name(&self) -> &str {
        "none"
    }

    fn next_delay(&self, _attempt: u32, _error: &str) -> Option<Duration> {
        None
    }

    fn max_attempts(&self) -> u32 {
        1
    }
}

use std::time::Duration;

use countdown_core::config::RetryConfig;
use countdown_core::resilience::RetryStrategyPlugin;

/// Auth failures: another attempt with the same credentials cannot succeed.
const FATAL_MARKERS: &[&str] = &["401", "403", "unauthorized", "forbidden", "invalid api key"];

/// Throttling responses wait the full `max_delay_ms` before the next attempt.
const THROTTLE_MARKERS: &[&str] = &["429", "rate limit", "too many requests"];

fn contains_any(error: &str, markers: &[&str]) -> bool {
    let lower = error.to_ascii_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// `base_delay_ms * factor`, capped at `max_delay_ms`; `None` once attempts run out.
fn scheduled_delay(cfg: &RetryConfig, attempt: u32, factor: u64, error: &str) -> Option<Duration> {
    if attempt >= cfg.max_attempts {
        return None;
    }
    let ms = if contains_any(error, THROTTLE_MARKERS) {
        cfg.max_delay_ms
    } else {
        cfg.base_delay_ms.saturating_mul(factor).min(cfg.max_delay_ms)
    };
    Some(Duration::from_millis(ms))
}

/// Doubles the delay after every failed attempt.
pub struct ExponentialBackoffPlugin {
    config: RetryConfig,
}

impl ExponentialBackoffPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategyPlugin for ExponentialBackoffPlugin {
    fn name(&self) -> &str {
        "exponential-backoff"
    }

    fn next_delay(&self, attempt: u32, error: &str) -> Option<Duration> {
        scheduled_delay(&self.config, attempt, 1u64 << attempt.min(30), error)
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        contains_any(error, FATAL_MARKERS)
    }
}

/// Grows the delay by `base_delay_ms` per failed attempt.
pub struct LinearRetryPlugin {
    config: RetryConfig,
}

impl LinearRetryPlugin {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl RetryStrategyPlugin for LinearRetryPlugin {
    fn name(&self) -> &str {
        "linear"
    }

    fn next_delay(&self, attempt: u32, error: &str) -> Option<Duration> {
        scheduled_delay(&self.config, attempt, u64::from(attempt) + 1, error)
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    fn is_fatal_error(&self, error: &str) -> bool {
        contains_any(error, FATAL_MARKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: &str, base: u64, max: u64, attempts: u32) -> RetryConfig {
        RetryConfig {
            strategy: strategy.to_string(),
            base_delay_ms: base,
            max_delay_ms: max,
            max_attempts: attempts,
        }
    }

    fn millis(delay: Option<Duration>) -> Option<u128> {
        delay.map(|d| d.as_millis())
    }

    #[test]
    fn test_exponential_schedule() {
        let plugin = ExponentialBackoffPlugin::new(config("exponential-backoff", 100, 1000, 5));

        let delays: Vec<Option<u128>> = (0..6)
            .map(|attempt| millis(plugin.next_delay(attempt, "503 from marketplace")))
            .collect();
        assert_eq!(
            delays,
            vec![Some(100), Some(200), Some(400), Some(800), Some(1000), None]
        );
    }

    #[test]
    fn test_linear_schedule() {
        let plugin = LinearRetryPlugin::new(config("linear", 50, 120, 4));

        assert_eq!(millis(plugin.next_delay(0, "timeout")), Some(50));
        assert_eq!(millis(plugin.next_delay(1, "timeout")), Some(100));
        assert_eq!(millis(plugin.next_delay(2, "timeout")), Some(120));
        assert_eq!(millis(plugin.next_delay(4, "timeout")), None);
    }

    #[test]
    fn test_throttling_waits_max_delay() {
        let plugin = ExponentialBackoffPlugin::new(config("exponential-backoff", 100, 5000, 3));
        assert_eq!(
            millis(plugin.next_delay(1, "speech failed: 429 Too Many Requests")),
            Some(5000)
        );
    }

    #[test]
    fn test_auth_errors_are_not_retried() {
        let plugin = LinearRetryPlugin::new(RetryConfig::default());
        assert!(!plugin.should_retry(1, "publisher failed: 401 Unauthorized"));
        assert!(plugin.should_retry(1, "publisher failed: 503 Service Unavailable"));
    }
}

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Circuit breaker states.
#[derive(Clone, Debug, PartialEq)]
pub enum CircuitState {
    /// Normal operation; counts consecutive failures
    Closed { failures: u32 },
    /// Failing fast until the recovery timeout passes
    Open { opened_at: Instant },
    /// Probing whether the service recovered
    HalfOpen { success_count: u32 },
}

/// Circuit breaker guarding one external service.
///
/// Cloning shares the underlying state, so one breaker can be handed to
/// every handler that talks to the same service.
#[derive(Clone, Debug)]
pub struct CircuitBreaker {
    name: String,
    state: Arc<Mutex<CircuitState>>,
    failure_threshold: u32,
    recovery_timeout: Duration,
    success_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        failure_threshold: u32,
        recovery_timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(CircuitState::Closed { failures: 0 })),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            success_threshold: success_threshold.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if a call may go through.
    pub fn allow(&self) -> bool {
        let mut state = self.lock();
        match *state {
            CircuitState::Closed { .. } | CircuitState::HalfOpen { .. } => true,
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.recovery_timeout {
                    tracing::info!(service = %self.name, "circuit half-open");
                    *state = CircuitState::HalfOpen { success_count: 0 };
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn success(&self) {
        let mut state = self.lock();
        match *state {
            CircuitState::HalfOpen { success_count } => {
                let new_count = success_count + 1;
                if new_count >= self.success_threshold {
                    tracing::info!(service = %self.name, "circuit closed");
                    *state = CircuitState::Closed { failures: 0 };
                } else {
                    *state = CircuitState::HalfOpen {
                        success_count: new_count,
                    };
                }
            }
            CircuitState::Closed { .. } => *state = CircuitState::Closed { failures: 0 },
            CircuitState::Open { .. } => {}
        }
    }

    /// Record a failed call.
    pub fn failure(&self) {
        let mut state = self.lock();
        match *state {
            CircuitState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.failure_threshold {
                    tracing::warn!(service = %self.name, failures, "circuit opened");
                    *state = CircuitState::Open {
                        opened_at: Instant::now(),
                    };
                } else {
                    *state = CircuitState::Closed { failures };
                }
            }
            CircuitState::HalfOpen { .. } => {
                tracing::warn!(service = %self.name, "probe failed; circuit reopened");
                *state = CircuitState::Open {
                    opened_at: Instant::now(),
                };
            }
            CircuitState::Open { .. } => {}
        }
    }

    /// Current state, for monitoring.
    pub fn state(&self) -> CircuitState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, CircuitState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new("marketplace", 3, Duration::from_secs(60), 1);

        breaker.failure();
        breaker.failure();
        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::Closed { failures: 2 });

        breaker.failure();
        assert!(!breaker.allow());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new("marketplace", 2, Duration::from_secs(60), 1);

        breaker.failure();
        breaker.success();
        breaker.failure();

        assert!(breaker.allow());
    }

    #[test]
    fn test_half_open_recovers_after_successes() {
        let breaker = CircuitBreaker::new("renderer", 1, Duration::ZERO, 2);

        breaker.failure();
        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen { success_count: 0 });

        breaker.success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen { success_count: 1 });
        breaker.success();
        assert_eq!(breaker.state(), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new("renderer", 1, Duration::ZERO, 2);

        breaker.failure();
        assert!(breaker.allow());
        breaker.failure();

        assert!(matches!(breaker.state(), CircuitState::Open { .. }));
    }

    #[test]
    fn test_clones_share_state() {
        let a = CircuitBreaker::new("blog", 1, Duration::from_secs(60), 1);
        let b = a.clone();

        a.failure();
        assert!(!b.allow());
    }
}

use std::future::Future;
use std::time::Duration;

use super::{CircuitBreaker, RetryStrategyPlugin};
use crate::error::HandlerError;

/// Run `op` until it succeeds or `strategy` gives up.
///
/// `op` receives the attempt number (0 for the first call). Each attempt is
/// bounded by `attempt_timeout` when set. Errors that are not retryable
/// (circuit open, missing input, context violations) are returned at once.
pub async fn retry_async<T, F, Fut>(
    strategy: &dyn RetryStrategyPlugin,
    operation: &str,
    attempt_timeout: Option<Duration>,
    mut op: F,
) -> Result<T, HandlerError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, HandlerError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let outcome = bounded(operation, attempt_timeout, op(attempt)).await;

        let err = match outcome {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation, retries = attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let message = err.to_string();
        if !err.is_retryable() || !strategy.should_retry(attempt + 1, &message) {
            tracing::warn!(operation, attempts = attempt + 1, error = %message, "giving up");
            return Err(err);
        }

        let Some(delay) = strategy.next_delay(attempt, &message) else {
            return Err(err);
        };

        attempt += 1;
        tracing::debug!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %message,
            "retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Await `fut`, turning an elapsed `limit` into [`HandlerError::Timeout`].
async fn bounded<T, Fut>(
    operation: &str,
    limit: Option<Duration>,
    fut: Fut,
) -> Result<T, HandlerError>
where
    Fut: Future<Output = Result<T, HandlerError>>,
{
    let Some(limit) = limit else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(HandlerError::Timeout {
            operation: operation.to_string(),
            timeout: limit,
        }),
    }
}

/// Retry `op` behind a circuit breaker.
///
/// Every attempt is checked against the breaker first; an open circuit ends
/// the call without touching the service. Attempts that time out count as
/// breaker failures.
pub async fn guarded_call<T, F, Fut>(
    breaker: &CircuitBreaker,
    strategy: &dyn RetryStrategyPlugin,
    operation: &str,
    attempt_timeout: Option<Duration>,
    mut op: F,
) -> Result<T, HandlerError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, HandlerError>>,
{
    retry_async(strategy, operation, None, |attempt| {
        let admitted = breaker.allow();
        let fut = admitted.then(|| op(attempt));
        async move {
            let Some(fut) = fut else {
                return Err(HandlerError::CircuitOpen(breaker.name().to_string()));
            };
            let res = bounded(operation, attempt_timeout, fut).await;
            match &res {
                Ok(_) => breaker.success(),
                Err(err) if err.is_retryable() => breaker.failure(),
                Err(_) => {}
            }
            res
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitState, NoRetry};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Fixed {
        attempts: u32,
    }

    impl RetryStrategyPlugin for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn next_delay(&self, _attempt: u32, _error: &str) -> Option<Duration> {
            Some(Duration::from_millis(1))
        }

        fn max_attempts(&self) -> u32 {
            self.attempts
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let value = retry_async(&Fixed { attempts: 3 }, "flaky", None, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(HandlerError::service("flaky", "503"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_at_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = retry_async(&Fixed { attempts: 2 }, "down", None, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(HandlerError::service("down", "500")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, HandlerError::Service { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let err = retry_async(&Fixed { attempts: 5 }, "lookup", None, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(HandlerError::missing("topic")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, HandlerError::MissingInput(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let err = retry_async(
            &NoRetry,
            "render.poll",
            Some(Duration::from_millis(5)),
            |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, HandlerError>(())
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, HandlerError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_timed_out_attempt_opens_circuit() {
        let breaker = CircuitBreaker::new("renderer", 1, Duration::from_secs(60), 1);

        let err = guarded_call(
            &breaker,
            &NoRetry,
            "renderer.status",
            Some(Duration::from_millis(5)),
            |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, HandlerError>(())
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, HandlerError::Timeout { .. }));
        assert!(matches!(breaker.state(), CircuitState::Open { .. }));
    }

    #[tokio::test]
    async fn test_first_retry_uses_first_delay() {
        struct Recording {
            asked: std::sync::Mutex<Vec<u32>>,
        }

        impl RetryStrategyPlugin for Recording {
            fn name(&self) -> &str {
                "recording"
            }

            fn next_delay(&self, attempt: u32, _error: &str) -> Option<Duration> {
                self.asked.lock().unwrap().push(attempt);
                Some(Duration::from_millis(1))
            }

            fn max_attempts(&self) -> u32 {
                3
            }
        }

        let strategy = Recording {
            asked: std::sync::Mutex::new(Vec::new()),
        };
        let _ = retry_async(&strategy, "down", None, |_| async {
            Err::<(), _>(HandlerError::service("down", "503"))
        })
        .await;

        assert_eq!(*strategy.asked.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits() {
        let breaker = CircuitBreaker::new("speech", 1, Duration::from_secs(60), 1);
        let calls = AtomicU32::new(0);

        let first = guarded_call(&breaker, &NoRetry, "speech.synthesize", None, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(HandlerError::service("speech", "502")) }
        })
        .await;
        assert!(first.is_err());

        let second = guarded_call(&breaker, &NoRetry, "speech.synthesize", None, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, HandlerError>(()) }
        })
        .await;

        assert!(matches!(second, Err(HandlerError::CircuitOpen(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Tests for the resilience facade
//!
//! The retry executor and circuit breaker have their own unit tests; these
//! check how `Resilience` composes them.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::error::{ErrorContext, ErrorKind, ServiceError};
    use crate::resilience::{CircuitBreakerConfig, CircuitBreakerStatus, Resilience, RetryConfig};

    fn resilience(max_retries: u32, failure_threshold: usize) -> Resilience {
        Resilience::new(
            "test",
            RetryConfig {
                max_retries,
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(5),
                randomization_factor: 0.0,
                ..RetryConfig::default()
            },
            CircuitBreakerConfig {
                failure_threshold,
                reset_timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_transient_failures_recover() {
        let resilience = resilience(3, 10);
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;

        let result = resilience
            .execute(|| async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ServiceError::timeout("slow upstream"))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(resilience.circuit_breaker_status(), CircuitBreakerStatus::Closed);
    }

    #[tokio::test]
    async fn test_permanent_failures_do_not_trip_breaker() {
        let resilience = resilience(3, 1);
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;

        for _ in 0..3 {
            let err = resilience
                .execute(|| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ServiceError::conflict("sha mismatch"))
                })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(resilience.circuit_breaker_status(), CircuitBreakerStatus::Closed);
    }

    #[tokio::test]
    async fn test_open_breaker_short_circuits() {
        let resilience = resilience(5, 2);
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;

        let err = resilience
            .execute(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ServiceError::service("upstream down").with_context(
                    ErrorContext::for_service("test").status_code(503),
                ))
            })
            .await
            .unwrap_err();

        // The breaker opens after the second failure and rejects the third attempt
        assert_eq!(err.kind(), ErrorKind::CircuitBroken);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(resilience.circuit_breaker_status(), CircuitBreakerStatus::Open);

        resilience.reset_circuit_breaker();
        assert_eq!(resilience.circuit_breaker_status(), CircuitBreakerStatus::Closed);
    }
}

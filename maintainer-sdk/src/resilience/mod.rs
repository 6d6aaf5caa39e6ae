//! Resilience patterns for service clients
//!
//! - Retry with exponential backoff
//! - Circuit breaker
//! - Unified resilience facade

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use retry::{RetryConfig, RetryExecutor};

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;

/// A unified resilience facade that composes retry and circuit breaking
#[derive(Debug, Clone)]
pub struct Resilience {
    retry: RetryExecutor,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl Resilience {
    /// Create a new resilience facade for the named dependency
    pub fn new(name: impl Into<String>, retry_config: RetryConfig, circuit_breaker_config: CircuitBreakerConfig) -> Self {
        Self {
            retry: RetryExecutor::new(retry_config),
            circuit_breaker: Arc::new(CircuitBreaker::new(name, circuit_breaker_config)),
        }
    }

    /// Execute a fallible operation with all configured resilience patterns
    ///
    /// Every attempt passes through the circuit breaker; only retryable
    /// failures count against it, so a rejected request (bad credentials,
    /// conflicts) never trips the breaker.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cb = &self.circuit_breaker;

        self.retry
            .execute(|| {
                let attempt = cb.check().map(|_| operation());
                async move {
                    match attempt {
                        Err(open) => Err(open),
                        Ok(call) => match call.await {
                            Ok(value) => {
                                cb.record_success();
                                Ok(value)
                            }
                            Err(err) => {
                                if err.is_retryable() {
                                    cb.record_failure();
                                }
                                Err(err)
                            }
                        },
                    }
                }
            })
            .await
    }

    /// Get the current status of the circuit breaker
    pub fn circuit_breaker_status(&self) -> CircuitBreakerStatus {
        self.circuit_breaker.status()
    }

    /// Reset the circuit breaker state
    pub fn reset_circuit_breaker(&self) {
        self.circuit_breaker.reset();
    }
}

/// Status of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerStatus {
    /// Circuit is closed, allowing requests
    Closed,

    /// Circuit is open, rejecting requests
    Open,

    /// Circuit is half-open, allowing trial requests
    HalfOpen,
}

impl std::fmt::Display for CircuitBreakerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

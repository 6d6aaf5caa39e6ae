//! Circuit breaker implementation for preventing cascading failures
//!
//! After `failure_threshold` consecutive retryable failures the breaker opens
//! and rejects calls until `reset_timeout` has elapsed. It then lets trial
//! calls through (half-open) and closes again after `success_threshold`
//! consecutive successes; any failure while half-open reopens it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{Result, ServiceError};

use super::CircuitBreakerStatus;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before the circuit opens
    pub failure_threshold: usize,

    /// Recovery timeout before allowing test requests
    pub reset_timeout: Duration,

    /// Number of successful test requests needed to close the circuit
    pub success_threshold: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    status: CircuitBreakerStatus,
    opened_at: Option<Instant>,
    consecutive_failures: usize,
    consecutive_successes: usize,
}

/// A thread-safe circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    state: Mutex<BreakerState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for the named dependency
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(BreakerState {
                status: CircuitBreakerStatus::Closed,
                opened_at: None,
                consecutive_failures: 0,
                consecutive_successes: 0,
            }),
            config,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // A poisoned breaker still holds consistent counters
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if the circuit allows a request
    pub fn check(&self) -> Result<()> {
        let mut state = self.lock();

        match state.status {
            CircuitBreakerStatus::Closed | CircuitBreakerStatus::HalfOpen => Ok(()),
            CircuitBreakerStatus::Open => {
                let elapsed = state.opened_at.map(|at| at.elapsed()).unwrap_or(self.config.reset_timeout);

                if elapsed >= self.config.reset_timeout {
                    log::info!("Circuit breaker '{}' half-open, allowing trial requests", self.name);
                    state.status = CircuitBreakerStatus::HalfOpen;
                    state.consecutive_successes = 0;
                    Ok(())
                } else {
                    let remaining = self.config.reset_timeout.saturating_sub(elapsed);
                    Err(ServiceError::circuit_broken(format!(
                        "{} is unavailable, retry in {}s",
                        self.name,
                        remaining.as_secs().max(1)
                    )))
                }
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.consecutive_failures = 0;

        if state.status == CircuitBreakerStatus::HalfOpen {
            state.consecutive_successes += 1;
            if state.consecutive_successes >= self.config.success_threshold {
                log::info!("Circuit breaker '{}' closed", self.name);
                state.status = CircuitBreakerStatus::Closed;
                state.opened_at = None;
                state.consecutive_successes = 0;
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.consecutive_successes = 0;
        state.consecutive_failures += 1;

        let trip = match state.status {
            CircuitBreakerStatus::HalfOpen => true,
            CircuitBreakerStatus::Closed => state.consecutive_failures >= self.config.failure_threshold,
            CircuitBreakerStatus::Open => false,
        };

        if trip {
            log::warn!(
                "Circuit breaker '{}' opened after {} consecutive failures",
                self.name,
                state.consecutive_failures
            );
            state.status = CircuitBreakerStatus::Open;
            state.opened_at = Some(Instant::now());
        }
    }

    /// Current status
    pub fn status(&self) -> CircuitBreakerStatus {
        self.lock().status
    }

    /// Force the breaker back to closed
    pub fn reset(&self) {
        let mut state = self.lock();
        state.status = CircuitBreakerStatus::Closed;
        state.opened_at = None;
        state.consecutive_failures = 0;
        state.consecutive_successes = 0;
    }
}

//! Retry with exponential backoff for recoverable errors

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

use crate::error::{Result, ServiceError};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_interval: Duration,

    /// Maximum backoff duration
    pub max_interval: Duration,

    /// Multiplier for backoff between retries
    pub multiplier: f64,

    /// Randomization applied to each interval (0.0-1.0)
    pub randomization_factor: f64,

    /// Maximum total time to spend retrying
    pub max_elapsed_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            randomization_factor: 0.2,
            max_elapsed_time: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_retries: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {} }}",
            self.max_retries, self.initial_interval, self.max_interval, self.multiplier
        )
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute a fallible operation, retrying errors for which
    /// `ServiceError::is_retryable` holds until the attempt or elapsed-time
    /// budget runs out.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.initial_interval,
            max_interval: self.config.max_interval,
            multiplier: self.config.multiplier,
            randomization_factor: self.config.randomization_factor,
            max_elapsed_time: self.config.max_elapsed_time,
            ..ExponentialBackoff::default()
        };
        backoff.reset();

        let mut attempts = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err) && attempts < self.config.max_retries => {
                    match backoff.next_backoff() {
                        Some(delay) => {
                            log::warn!(
                                "Operation failed with retryable error, retrying in {:?} (attempt {}/{}): {}",
                                delay,
                                attempts + 1,
                                self.config.max_retries,
                                crate::util::sanitize_for_logging(&err.to_string())
                            );
                            tokio::time::sleep(delay).await;
                            attempts += 1;
                        }
                        None => return Err(err.with_context_value("attempts", attempts + 1)),
                    }
                }
                Err(err) if attempts > 0 => return Err(err.with_context_value("attempts", attempts + 1)),
                Err(err) => return Err(err),
            }
        }
    }

    fn should_retry(&self, error: &ServiceError) -> bool {
        error.is_retryable()
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

//! Error handling for the Maintainer SDK
//!
//! This module provides the error system shared by every service client:
//! - Categorizes errors by type (network, auth, rate limit, conflict, etc.)
//! - Adds context (service, status code, endpoint) to errors
//! - Maps service-specific error responses to normalized kinds
//! - Provides a convenient Result type alias

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod mapping;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the SDK
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization errors (permission issues)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Revision conflicts on versioned resources
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream service failures (5xx and unclassified statuses)
    #[error("Service error: {0}")]
    Service(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Circuit breaker open errors
    #[error("Circuit broken: {0}")]
    CircuitBroken(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

/// Flat classification of a `ServiceError`, ignoring attached context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Authentication,
    Authorization,
    RateLimit,
    Conflict,
    Service,
    Validation,
    Parsing,
    Configuration,
    Timeout,
    Internal,
    NotFound,
    CircuitBroken,
}

impl ServiceError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        ServiceError::RateLimit(message.into())
    }

    /// Create a revision conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    /// Create a service-specific error
    pub fn service(message: impl Into<String>) -> Self {
        ServiceError::Service(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Create a circuit broken error
    pub fn circuit_broken(message: impl Into<String>) -> Self {
        ServiceError::CircuitBroken(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Add a single context key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        match self {
            ServiceError::WithContext { inner, mut context } => {
                context.add(key, value);
                ServiceError::WithContext { inner, context }
            }
            other => {
                let mut context = ErrorContext::new();
                context.add(key, value);
                other.with_context(context)
            }
        }
    }

    /// The kind of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Network(_) => ErrorKind::Network,
            ServiceError::Authentication(_) => ErrorKind::Authentication,
            ServiceError::Authorization(_) => ErrorKind::Authorization,
            ServiceError::RateLimit(_) => ErrorKind::RateLimit,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Service(_) => ErrorKind::Service,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Parsing(_) => ErrorKind::Parsing,
            ServiceError::Configuration(_) => ErrorKind::Configuration,
            ServiceError::Timeout(_) => ErrorKind::Timeout,
            ServiceError::Internal(_) => ErrorKind::Internal,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::CircuitBroken(_) => ErrorKind::CircuitBroken,
            ServiceError::WithContext { inner, .. } => inner.kind(),
        }
    }

    /// The innermost error message, without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            ServiceError::Network(m)
            | ServiceError::Authentication(m)
            | ServiceError::Authorization(m)
            | ServiceError::RateLimit(m)
            | ServiceError::Conflict(m)
            | ServiceError::Service(m)
            | ServiceError::Validation(m)
            | ServiceError::Parsing(m)
            | ServiceError::Configuration(m)
            | ServiceError::Timeout(m)
            | ServiceError::Internal(m)
            | ServiceError::NotFound(m)
            | ServiceError::CircuitBroken(m) => m,
            ServiceError::WithContext { inner, .. } => inner.message(),
        }
    }

    /// Attached context, if any
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ServiceError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::WithContext { inner, context } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Check if this is a retryable error
    ///
    /// Upstream `Service` errors are retryable only when they carry a 5xx
    /// status; a bare `Service` error has no status and is treated as final.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimit => true,
            ErrorKind::Service => self
                .status_code()
                .map(|status| (500..600).contains(&status))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// Time the error was observed
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Service-specific error code
    pub error_code: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: chrono::Utc::now(),
            status_code: None,
            error_code: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add an error code
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Add a context value and return self (builder pattern)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.add(key, value);
        self
    }
}


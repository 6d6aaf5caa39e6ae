//! Core abstractions shared by every service client

use crate::resilience::CircuitBreakerStatus;

/// Base trait for all service clients
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Current state of the client's circuit breaker
    fn circuit_status(&self) -> CircuitBreakerStatus;

    /// Whether the client is currently accepting calls
    fn is_available(&self) -> bool {
        self.circuit_status() != CircuitBreakerStatus::Open
    }
}

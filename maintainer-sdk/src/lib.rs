//! # Maintainer SDK
//!
//! Typed clients for the external services the Vesper maintainer talks to.
//!
//! This crate provides:
//!
//! - A reasoning-service client for OpenAI-compatible chat completion APIs
//! - A record-store client for the GitHub contents API (token or App auth)
//! - A normalized error taxonomy with HTTP status mapping
//! - Resilience patterns (retries with backoff, circuit breakers)
//! - Configuration providers backed by the environment or memory
//!
//! ## Architecture
//!
//! - `ServiceError`: every failure surfaced by a client, classified by kind
//! - `Resilience`: facade composing `RetryExecutor` and `CircuitBreaker`
//! - `ConfigProvider`: string-keyed configuration lookups, layered
//! - `OpenAIClient` / `GitHubClient`: long-lived, shareable service handles

pub mod core;
pub use crate::core::ServiceClient;

pub mod error;
pub use error::{ErrorContext, ErrorKind, Result, ServiceError};

pub mod resilience;
pub use resilience::{CircuitBreaker, CircuitBreakerStatus, Resilience, RetryExecutor};

pub mod config;
pub use config::{ConfigProvider, ConfigProviderExt, ServiceConfig};

pub mod services;
pub use services::{github, openai};

pub mod util;

#[cfg(test)]
mod tests;

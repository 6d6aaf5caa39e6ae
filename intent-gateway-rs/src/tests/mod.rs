//! Router-level tests for the gateway

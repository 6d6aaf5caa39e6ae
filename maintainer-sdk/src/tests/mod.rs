//! Unit tests for the Maintainer SDK
//!
//! Mock-server tests for each service client plus cross-module tests of the
//! resilience facade and configuration loading.

pub mod config_tests;
pub mod github_mock_tests;
pub mod resilience_tests;

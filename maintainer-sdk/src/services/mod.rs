//! Service-specific client implementations

pub mod common;
pub mod github;
pub mod openai;

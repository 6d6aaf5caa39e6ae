//! Gateway configuration
//!
//! Read once at startup from a `ConfigProvider`. Any missing or invalid
//! required value is a `ConfigurationError` and aborts startup.

use maintainer_sdk::config::{GitHubConfig, OpenAIConfig};
use maintainer_sdk::{ConfigProvider, ConfigProviderExt, ServiceError};
use thiserror::Error;

use crate::intent::{DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH};
use crate::pipeline::PlanMode;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Everything the gateway needs to start
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub plan_mode: PlanMode,
    /// Present in reasoned mode only
    pub openai: Option<OpenAIConfig>,
    pub github: GitHubConfig,
}

impl GatewayConfig {
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self, ConfigurationError> {
        let plan_mode = match provider.get_optional("intent_plan_mode") {
            Some(value) => value.parse::<PlanMode>().map_err(ConfigurationError::Invalid)?,
            None => PlanMode::default(),
        };

        let min_length = length(provider, "intent_min_length", DEFAULT_MIN_LENGTH)?;
        let max_length = length(provider, "intent_max_length", DEFAULT_MAX_LENGTH)?;
        if min_length == 0 {
            return Err(ConfigurationError::Invalid(
                "INTENT_MIN_LENGTH must be at least 1".to_string(),
            ));
        }
        if min_length > max_length {
            return Err(ConfigurationError::Invalid(format!(
                "INTENT_MIN_LENGTH ({}) exceeds INTENT_MAX_LENGTH ({})",
                min_length, max_length
            )));
        }

        let openai = match plan_mode {
            PlanMode::Reasoned => Some(OpenAIConfig::from_provider(provider)?),
            PlanMode::Verbatim => None,
        };

        Ok(Self {
            min_length,
            max_length,
            plan_mode,
            openai,
            github: GitHubConfig::from_provider(provider)?,
        })
    }
}

fn length<P: ConfigProvider + ?Sized>(provider: &P, key: &str, default: usize) -> Result<usize, ConfigurationError> {
    let value = provider.get_u64_or(key, default as u64)?;
    usize::try_from(value).map_err(|_| ConfigurationError::Invalid(format!("{} is out of range", key)))
}

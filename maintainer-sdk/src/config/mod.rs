//! Configuration management for service clients
//!
//! String-keyed providers (environment, memory, composite) and the typed
//! per-service configurations built from them. Keys are lower-case and
//! underscore-separated; `EnvConfigProvider` upper-cases them, so
//! `openai_api_key` reads `OPENAI_API_KEY`.

use std::collections::HashMap;
use std::env;
use std::fmt::{self, Debug};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{Result, ServiceError};

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

impl<P: ConfigProvider + ?Sized> ConfigProvider for Arc<P> {
    fn get_string(&self, key: &str) -> Result<String> {
        (**self).get_string(key)
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProvider for Box<P> {
    fn get_string(&self, key: &str) -> Result<String> {
        (**self).get_string(key)
    }
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a non-blank string value, treating blank values as missing
    fn get_non_empty(&self, key: &str) -> Result<String> {
        let value = self.get_string(key)?;
        if value.trim().is_empty() {
            Err(ServiceError::configuration(format!("Configuration key is empty: {}", key)))
        } else {
            Ok(value)
        }
    }

    /// Get an optional non-blank string value
    fn get_optional(&self, key: &str) -> Option<String> {
        self.get_non_empty(key).ok()
    }

    /// Get an unsigned integer configuration value
    fn get_u64(&self, key: &str) -> Result<u64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<u64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e)))
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value
            .trim()
            .parse::<f64>()
            .map_err(|e| ServiceError::configuration(format!("Invalid float for key {}: {}", key, e)))
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get an unsigned integer with a default when the key is absent.
    /// A present but malformed value is still an error.
    fn get_u64_or(&self, key: &str, default: u64) -> Result<u64> {
        match self.get_optional(key) {
            Some(_) => self.get_u64(key),
            None => Ok(default),
        }
    }

    /// Get a float with a default when the key is absent.
    /// A present but malformed value is still an error.
    fn get_float_or(&self, key: &str, default: f64) -> Result<f64> {
        match self.get_optional(key) {
            Some(_) => self.get_float(key),
            None => Ok(default),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "OPENAI", "GITHUB")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    pub fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => {
                ServiceError::configuration(format!("Environment variable is not valid unicode: {}", env_key))
            }
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }

    /// Builder-style variant of `set`
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.set(key, value);
        self
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Builder-style variant of `add_provider`
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get_string(key).ok())
            .ok_or_else(|| {
                ServiceError::configuration(format!("Configuration key not found in any provider: {}", key))
            })
    }
}

/// Global default configuration provider: the process environment, unprefixed
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> = Lazy::new(|| Arc::new(EnvConfigProvider::new()));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Configuration for the OpenAI-compatible reasoning service
#[derive(Clone)]
pub struct OpenAIConfig {
    /// API key
    pub api_key: String,

    /// Organization ID (optional)
    pub org_id: Option<String>,

    /// Base URL (can be changed for proxies and compatible providers)
    pub base_url: String,

    /// Model used for plan extraction
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            org_id: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1".to_string(),
            temperature: 0.2,
            timeout_seconds: 60,
        }
    }
}

impl Debug for OpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"[REDACTED]")
            .field("org_id", &self.org_id)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl OpenAIConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            api_key: provider.get_non_empty("openai_api_key")?,
            org_id: provider.get_optional("openai_org_id"),
            base_url: provider.get_string_or("openai_base_url", &defaults.base_url),
            model: provider.get_string_or("openai_model", &defaults.model),
            temperature: provider.get_float_or("openai_temperature", f64::from(defaults.temperature))? as f32,
            timeout_seconds: provider.get_u64_or("openai_timeout_seconds", defaults.timeout_seconds)?,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for OpenAIConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::configuration("OpenAI API key is required"));
        }

        if self.base_url.trim().is_empty() {
            return Err(ServiceError::configuration("OpenAI base URL is required"));
        }

        if self.model.trim().is_empty() {
            return Err(ServiceError::configuration("OpenAI model is required"));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ServiceError::configuration(format!(
                "OpenAI temperature must be within 0.0-2.0, got {}",
                self.temperature
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(ServiceError::configuration("OpenAI timeout must be greater than zero"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "openai"
    }
}

/// How the GitHub client authenticates
#[derive(Clone)]
pub enum GitHubAuth {
    /// Personal access token or pre-minted installation token
    Token(String),

    /// GitHub App credentials exchanged for installation tokens
    App {
        app_id: String,
        installation_id: String,
        private_key_pem: String,
    },
}

impl Debug for GitHubAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitHubAuth::Token(_) => f.debug_tuple("Token").field(&"[REDACTED]").finish(),
            GitHubAuth::App {
                app_id,
                installation_id,
                ..
            } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("installation_id", installation_id)
                .field("private_key_pem", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Configuration for the GitHub record-store backend
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Credentials
    pub auth: GitHubAuth,

    /// API base URL
    pub api_url: String,

    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Target branch; the repository default branch when unset
    pub branch: Option<String>,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

impl GitHubConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";
    pub const DEFAULT_OWNER: &'static str = "vesper-systems";
    pub const DEFAULT_REPO: &'static str = "vesper-maintainer";

    /// Build a token-authenticated configuration with default target settings
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth: GitHubAuth::Token(token.into()),
            api_url: Self::DEFAULT_API_URL.to_string(),
            owner: Self::DEFAULT_OWNER.to_string(),
            repo: Self::DEFAULT_REPO.to_string(),
            branch: None,
            timeout_seconds: 30,
        }
    }

    /// Load configuration from a config provider
    ///
    /// A token (`github_token`) takes precedence over App credentials. App
    /// private keys supplied through single-line environment variables may
    /// encode newlines as a literal `\n`.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let auth = match provider.get_optional("github_token") {
            Some(token) => GitHubAuth::Token(token),
            None => {
                let app_id = provider.get_optional("github_app_id");
                let installation_id = provider.get_optional("github_app_installation_id");
                let private_key = provider.get_optional("github_app_private_key");

                match (app_id, installation_id, private_key) {
                    (Some(app_id), Some(installation_id), Some(key)) => GitHubAuth::App {
                        app_id,
                        installation_id,
                        private_key_pem: key.replace("\\n", "\n"),
                    },
                    (None, None, None) => {
                        return Err(ServiceError::configuration(
                            "GitHub credentials are required: set GITHUB_TOKEN or GITHUB_APP_ID, \
                             GITHUB_APP_INSTALLATION_ID and GITHUB_APP_PRIVATE_KEY",
                        ))
                    }
                    _ => {
                        return Err(ServiceError::configuration(
                            "Incomplete GitHub App credentials: GITHUB_APP_ID, GITHUB_APP_INSTALLATION_ID \
                             and GITHUB_APP_PRIVATE_KEY must all be set",
                        ))
                    }
                }
            }
        };

        let config = Self {
            auth,
            api_url: provider.get_string_or("github_api_url", Self::DEFAULT_API_URL),
            owner: provider.get_string_or("github_owner", Self::DEFAULT_OWNER),
            repo: provider.get_string_or("github_repo", Self::DEFAULT_REPO),
            branch: provider.get_optional("github_branch"),
            timeout_seconds: provider.get_u64_or("github_timeout_seconds", 30)?,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for GitHubConfig {
    fn validate(&self) -> Result<()> {
        match &self.auth {
            GitHubAuth::Token(token) if token.trim().is_empty() => {
                return Err(ServiceError::configuration("GitHub token is empty"));
            }
            GitHubAuth::App {
                app_id,
                installation_id,
                private_key_pem,
            } => {
                if app_id.trim().parse::<u64>().is_err() {
                    return Err(ServiceError::configuration("GitHub App ID must be numeric"));
                }
                if installation_id.trim().parse::<u64>().is_err() {
                    return Err(ServiceError::configuration("GitHub App installation ID must be numeric"));
                }
                if !private_key_pem.contains("PRIVATE KEY") {
                    return Err(ServiceError::configuration("GitHub App private key is not a PEM document"));
                }
            }
            GitHubAuth::Token(_) => {}
        }

        let valid_segment = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };

        if !valid_segment(&self.owner) || !valid_segment(&self.repo) {
            return Err(ServiceError::configuration(format!(
                "Invalid GitHub repository: {}/{}",
                self.owner, self.repo
            )));
        }

        if self.api_url.trim().is_empty() {
            return Err(ServiceError::configuration("GitHub API URL is required"));
        }

        if self.timeout_seconds == 0 {
            return Err(ServiceError::configuration("GitHub timeout must be greater than zero"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "github"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_formatting() {
        let provider = EnvConfigProvider::new().with_prefix("TEST").with_namespace("CONFIG");

        assert_eq!(provider.format_key("api_key"), "TEST_CONFIG_API_KEY");
        assert_eq!(provider.format_key("base-url"), "TEST_CONFIG_BASE_URL");
        assert_eq!(EnvConfigProvider::new().format_key("openai_api_key"), "OPENAI_API_KEY");
    }

    #[test]
    fn test_openai_config_defaults() {
        let provider = MemoryConfigProvider::new().with("openai_api_key", "test_api_key");

        let config = OpenAIConfig::from_provider(&provider).unwrap();
        assert_eq!(config.api_key, "test_api_key");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4.1");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn test_openai_config_requires_key() {
        assert!(OpenAIConfig::from_provider(&MemoryConfigProvider::new()).is_err());

        let blank = MemoryConfigProvider::new().with("openai_api_key", "   ");
        assert!(OpenAIConfig::from_provider(&blank).is_err());
    }

    #[test]
    fn test_openai_config_rejects_bad_numbers() {
        let provider = MemoryConfigProvider::new()
            .with("openai_api_key", "k")
            .with("openai_timeout_seconds", "soon");
        assert!(OpenAIConfig::from_provider(&provider).is_err());

        let provider = MemoryConfigProvider::new()
            .with("openai_api_key", "k")
            .with("openai_temperature", "3.5");
        assert!(OpenAIConfig::from_provider(&provider).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = OpenAIConfig {
            api_key: "sk-very-secret".to_string(),
            ..OpenAIConfig::default()
        };
        assert!(!format!("{:?}", config).contains("sk-very-secret"));

        let github = GitHubConfig::with_token("ghp_secret_token");
        assert!(!format!("{:?}", github).contains("ghp_secret_token"));
    }
}

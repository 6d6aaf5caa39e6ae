//! OpenAI API client implementation
//!
//! A strongly-typed client for OpenAI-compatible chat completion APIs.
//! Every call goes through the client's `Resilience` facade, so transient
//! transport failures and 5xx responses are retried with backoff while
//! rejected requests surface immediately.

mod models;
pub use models::*;

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{OpenAIConfig, ServiceConfig};
use crate::core::ServiceClient;
use crate::error::{Result, ServiceError};
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerStatus, Resilience, RetryConfig};
use crate::services::common::{build_http_client, map_send_error, parse_error_response, UserAgent};

/// OpenAI API client
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: OpenAIConfig,

    /// Resilience patterns
    resilience: Resilience,
}

impl OpenAIClient {
    /// Create a client with the default resilience policy
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Self::with_resilience(config, default_retry_config(), default_circuit_breaker_config())
    }

    /// Create a client with explicit retry and circuit breaker policies
    pub fn with_resilience(
        config: OpenAIConfig,
        retry: RetryConfig,
        circuit_breaker: CircuitBreakerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent::for_client("openai-client")),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self {
            http_client,
            config,
            resilience: Resilience::new("openai", retry, circuit_breaker),
        })
    }

    /// Create a new builder for the OpenAI client
    pub fn builder() -> OpenAIClientBuilder {
        OpenAIClientBuilder::default()
    }

    /// Configured model
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Configured sampling temperature
    pub fn temperature(&self) -> f32 {
        self.config.temperature
    }

    /// Send a chat completion request
    pub async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        self.resilience
            .execute(|| self.post_json("chat/completions", request))
            .await
    }

    /// Single-turn completion with the configured model
    ///
    /// Returns the first choice's text, or `None` when the model produced
    /// nothing but whitespace. `temperature` overrides the configured value.
    pub async fn complete(&self, system: &str, user: &str, temperature: Option<f32>) -> Result<Option<String>> {
        self.single_turn(system, user, temperature, None).await
    }

    /// Single-turn completion constrained to a JSON object
    ///
    /// JSON mode needs the word "JSON" somewhere in the messages; the API
    /// rejects the request otherwise.
    pub async fn complete_json(&self, system: &str, user: &str, temperature: Option<f32>) -> Result<Option<String>> {
        self.single_turn(system, user, temperature, Some(ResponseFormat::json_object()))
            .await
    }

    async fn single_turn(
        &self,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        response_format: Option<ResponseFormat>,
    ) -> Result<Option<String>> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: Some(temperature.unwrap_or(self.config.temperature)),
            response_format,
            ..Default::default()
        };

        let response = self.chat_completion(&request).await?;
        if response.first_content().is_none() {
            warn!(
                "OpenAI returned no completion text (finish_reason: {})",
                response.finish_reason().unwrap_or("none")
            );
        }

        Ok(response.first_content().map(str::to_string))
    }

    async fn post_json<T, R>(&self, endpoint: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        debug!("POST {}", url);

        let mut request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body);

        if let Some(org) = &self.config.org_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_send_error("openai", endpoint, e))?;

        if !response.status().is_success() {
            return Err(parse_error_response("openai", endpoint, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_send_error("openai", endpoint, e))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::parsing(format!("Failed to parse OpenAI response: {}", e)))
    }
}

impl ServiceClient for OpenAIClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn circuit_status(&self) -> CircuitBreakerStatus {
        self.resilience.circuit_breaker_status()
    }
}

fn default_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_interval: Duration::from_millis(500),
        max_interval: Duration::from_secs(8),
        ..RetryConfig::default()
    }
}

fn default_circuit_breaker_config() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 5,
        reset_timeout: Duration::from_secs(60),
        ..CircuitBreakerConfig::default()
    }
}

/// Builder for the OpenAI client
#[derive(Debug, Default)]
pub struct OpenAIClientBuilder {
    config: OpenAIConfig,
    retry: Option<RetryConfig>,
    circuit_breaker: Option<CircuitBreakerConfig>,
}

impl OpenAIClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    pub fn org_id(mut self, org_id: impl Into<String>) -> Self {
        self.config.org_id = Some(org_id.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn circuit_breaker(mut self, circuit_breaker: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(circuit_breaker);
        self
    }

    pub fn build(self) -> Result<OpenAIClient> {
        OpenAIClient::with_resilience(
            self.config,
            self.retry.unwrap_or_else(default_retry_config),
            self.circuit_breaker.unwrap_or_else(default_circuit_breaker_config),
        )
    }
}

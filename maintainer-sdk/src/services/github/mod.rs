//! GitHub contents API client
//!
//! Reads file metadata and writes whole files to a single configured
//! repository. Writes are optimistic: an update carries the blob SHA it
//! replaces and GitHub rejects it when the file moved on in between.
//!
//! GitHub reports that rejection in two ways, `409 Conflict` and
//! `422 "sha wasn't supplied"` (or a mismatching sha); both surface as
//! `ErrorKind::Conflict`.

mod auth;
mod models;
pub use models::{CommitMeta, ContentMeta, PutContentsResponse};

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use url::Url;

use self::auth::TokenSource;
use self::models::PutContentsRequest;
use crate::config::{GitHubConfig, ServiceConfig};
use crate::core::ServiceClient;
use crate::error::{Result, ServiceError};
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerStatus, Resilience, RetryConfig};
use crate::services::common::{build_http_client, map_send_error, parse_error_response, UserAgent};

pub(crate) const MEDIA_TYPE: &str = "application/vnd.github+json";
pub(crate) const API_VERSION: &str = "2022-11-28";

/// GitHub contents API client bound to one repository
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http_client: Client,
    api_url: String,
    owner: String,
    repo: String,
    branch: Option<String>,
    auth: Arc<TokenSource>,
    resilience: Resilience,
}

impl GitHubClient {
    /// Create a client with the default resilience policy
    pub fn new(config: GitHubConfig) -> Result<Self> {
        Self::with_resilience(config, default_retry_config(), default_circuit_breaker_config())
    }

    /// Create a client with explicit retry and circuit breaker policies
    pub fn with_resilience(
        config: GitHubConfig,
        retry: RetryConfig,
        circuit_breaker: CircuitBreakerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Url::parse(&config.api_url)
            .map_err(|e| ServiceError::configuration(format!("Invalid GitHub API URL: {}", e)))?;

        let auth = TokenSource::from_auth(&config.auth, &config.api_url)?;
        let http_client = build_http_client(
            Some(UserAgent::for_client("github-client")),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self {
            http_client,
            api_url: config.api_url,
            owner: config.owner,
            repo: config.repo,
            branch: config.branch,
            auth: Arc::new(auth),
            resilience: Resilience::new("github", retry, circuit_breaker),
        })
    }

    /// `owner/repo` this client writes to
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Target branch, when not the repository default
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Current metadata of the file at `path`, `None` when it does not exist
    pub async fn get_contents(&self, path: &str) -> Result<Option<ContentMeta>> {
        let mut url = self.contents_url(path)?;
        if let Some(branch) = &self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        self.resilience.execute(|| self.fetch_contents(&url, path)).await
    }

    /// Create or replace the file at `path`
    ///
    /// `sha` must be the current blob SHA when replacing and `None` when
    /// creating. A stale or missing SHA fails with `ErrorKind::Conflict`.
    pub async fn put_contents(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutContentsResponse> {
        let url = self.contents_url(path)?;
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content),
            sha,
            branch: self.branch.as_deref(),
        };

        self.resilience.execute(|| self.write_contents(&url, path, &body)).await
    }

    async fn fetch_contents(&self, url: &Url, path: &str) -> Result<Option<ContentMeta>> {
        let endpoint = format!("contents/{}", path);
        let response = self.send(self.request(Method::GET, url).await?, &endpoint).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.error_from(&endpoint, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_send_error("github", &endpoint, e))?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::parsing(format!("Failed to parse GitHub contents response: {}", e)))?;

        if body.is_array() {
            return Err(ServiceError::validation(format!("{} is a directory", path)));
        }

        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ServiceError::parsing(format!("Failed to parse GitHub contents response: {}", e)))
    }

    async fn write_contents(
        &self,
        url: &Url,
        path: &str,
        body: &PutContentsRequest<'_>,
    ) -> Result<PutContentsResponse> {
        let endpoint = format!("contents/{}", path);
        let request = self.request(Method::PUT, url).await?.json(body);
        let response = self.send(request, &endpoint).await?;

        if !response.status().is_success() {
            return Err(self.error_from(&endpoint, response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_send_error("github", &endpoint, e))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::parsing(format!("Failed to parse GitHub write response: {}", e)))
    }

    async fn request(&self, method: Method, url: &Url) -> Result<RequestBuilder> {
        let token = self.auth.bearer(&self.http_client).await?;

        Ok(self
            .http_client
            .request(method, url.clone())
            .header("Accept", MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<reqwest::Response> {
        debug!("GitHub {} {}", self.repository(), endpoint);
        request
            .send()
            .await
            .map_err(|e| map_send_error("github", endpoint, e))
    }

    async fn error_from(&self, endpoint: &str, response: reqwest::Response) -> ServiceError {
        if response.status() == StatusCode::UNAUTHORIZED {
            self.auth.invalidate().await;
        }
        parse_error_response("github", endpoint, response).await
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| ServiceError::configuration(format!("Invalid GitHub API URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ServiceError::configuration("GitHub API URL cannot be a base URL"))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
            .extend(path.split('/').filter(|segment| !segment.is_empty()));

        Ok(url)
    }
}

impl ServiceClient for GitHubClient {
    fn name(&self) -> &str {
        "github"
    }

    fn base_url(&self) -> &str {
        &self.api_url
    }

    fn circuit_status(&self) -> CircuitBreakerStatus {
        self.resilience.circuit_breaker_status()
    }
}

fn default_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        initial_interval: Duration::from_millis(250),
        max_interval: Duration::from_secs(5),
        ..RetryConfig::default()
    }
}

fn default_circuit_breaker_config() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 5,
        reset_timeout: Duration::from_secs(30),
        ..CircuitBreakerConfig::default()
    }
}

//! Common utilities for service clients

use std::fmt;
use std::time::Duration;

use reqwest::{header, Client};

use crate::error::{ErrorContext, Result, ServiceError};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "Vesper-Maintainer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("maintainer-sdk".to_string()),
        }
    }
}

impl UserAgent {
    /// Default user agent tagged with the calling client
    pub fn for_client(client: &str) -> Self {
        Self {
            extra: Some(client.to_string()),
            ..Self::default()
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with default settings
pub fn build_http_client(user_agent: Option<UserAgent>, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout.unwrap_or_else(|| Duration::from_secs(30)))
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Map a transport-level send failure, keeping timeouts distinguishable
pub fn map_send_error(service_name: &str, endpoint: &str, err: reqwest::Error) -> ServiceError {
    let context = ErrorContext::for_service(service_name).endpoint(endpoint);

    if err.is_timeout() {
        ServiceError::timeout(format!("Request to {} timed out", service_name)).with_context(context)
    } else {
        ServiceError::network(format!("Failed to send request to {}: {}", service_name, err)).with_context(context)
    }
}

/// Parse error response from HTTP response
pub async fn parse_error_response(service_name: &str, endpoint: &str, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let mut context = ErrorContext::for_service(service_name)
        .status_code(status.as_u16())
        .endpoint(endpoint);

    for name in ["x-ratelimit-remaining", "retry-after"] {
        if let Some(value) = response.headers().get(name).and_then(|v| v.to_str().ok()) {
            context.add(name.replace('-', "_").trim_start_matches("x_"), value);
        }
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    let error = crate::error::mapping::map_http_error(status, &body, &mut context);
    log::debug!(
        "{} {} failed with {}: {}",
        service_name,
        endpoint,
        status,
        crate::util::sanitize_for_logging(&error.to_string())
    );

    error.with_context(context)
}

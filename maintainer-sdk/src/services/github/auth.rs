//! Credentials for the GitHub client
//!
//! Static tokens are used as-is. GitHub App credentials are exchanged for
//! installation access tokens: an RS256 JWT signed with the App key is
//! posted to `/app/installations/{id}/access_tokens`, and the returned
//! token is cached until shortly before it expires.

use std::fmt;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;

use super::models::InstallationToken;
use super::{API_VERSION, MEDIA_TYPE};
use crate::config::GitHubAuth;
use crate::error::{ErrorContext, Result, ServiceError};
use crate::services::common::{map_send_error, parse_error_response};

/// Installation tokens are refreshed this long before GitHub expires them
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Source of bearer tokens for GitHub requests
pub(crate) enum TokenSource {
    Static(String),
    App(AppTokenSource),
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("TokenSource::Static([REDACTED])"),
            TokenSource::App(app) => f
                .debug_struct("TokenSource::App")
                .field("app_id", &app.app_id)
                .field("installation_id", &app.installation_id)
                .finish(),
        }
    }
}

impl TokenSource {
    /// Build a token source from configured credentials
    ///
    /// App keys are parsed eagerly so a malformed key aborts startup rather
    /// than the first write.
    pub fn from_auth(auth: &GitHubAuth, api_url: &str) -> Result<Self> {
        match auth {
            GitHubAuth::Token(token) => Ok(TokenSource::Static(token.clone())),
            GitHubAuth::App {
                app_id,
                installation_id,
                private_key_pem,
            } => {
                let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
                    ServiceError::configuration(format!("Invalid GitHub App private key: {}", e))
                })?;

                Ok(TokenSource::App(AppTokenSource {
                    app_id: app_id.trim().to_string(),
                    installation_id: installation_id.trim().to_string(),
                    key,
                    api_url: api_url.trim_end_matches('/').to_string(),
                    cached: Mutex::new(None),
                }))
            }
        }
    }

    /// Bearer token for the next request
    pub async fn bearer(&self, http_client: &Client) -> Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::App(app) => app.installation_token(http_client).await,
        }
    }

    /// Drop a cached installation token after GitHub rejected it
    pub async fn invalidate(&self) {
        if let TokenSource::App(app) = self {
            app.cached.lock().await.take();
        }
    }
}

pub(crate) struct AppTokenSource {
    app_id: String,
    installation_id: String,
    key: EncodingKey,
    api_url: String,
    cached: Mutex<Option<InstallationToken>>,
}

impl AppTokenSource {
    fn generate_jwt(&self, now: i64) -> Result<String> {
        let claims = AppClaims {
            iat: now - 60,
            exp: now + 600,
            iss: self.app_id.clone(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| ServiceError::authentication(format!("Failed to sign GitHub App JWT: {}", e)))
    }

    async fn installation_token(&self, http_client: &Client) -> Result<String> {
        // Held across the exchange so concurrent writers mint at most one token
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - ChronoDuration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(token.token.clone());
            }
        }

        let endpoint = format!("app/installations/{}/access_tokens", self.installation_id);
        let jwt = self.generate_jwt(now.timestamp())?;
        debug!("Minting installation token for GitHub App {}", self.app_id);

        let response = http_client
            .post(format!("{}/{}", self.api_url, endpoint))
            .header("Accept", MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer_auth(jwt)
            .send()
            .await
            .map_err(|e| map_send_error("github", &endpoint, e))?;

        if !response.status().is_success() {
            return Err(parse_error_response("github", &endpoint, response).await);
        }

        let token: InstallationToken = response.json().await.map_err(|e| {
            ServiceError::parsing(format!("Failed to parse installation token: {}", e))
                .with_context(ErrorContext::for_service("github").endpoint(endpoint.as_str()))
        })?;

        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

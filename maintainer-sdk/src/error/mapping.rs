//! Error mapping for service-specific APIs
//!
//! Converts HTTP error responses from each upstream into a normalized
//! `ServiceError`. The service name stored on the `ErrorContext` selects
//! the mapping.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Map an OpenAI API error to a ServiceError
pub fn map_openai_error(status: StatusCode, json: &Value, context: &mut ErrorContext) -> ServiceError {
    context.service = "openai".to_string();

    let message = match json.get("error") {
        Some(error) => {
            if let Some(error_type) = error.get("type").and_then(|t| t.as_str()) {
                context.add("error_type", error_type);
            }

            if let Some(code) = error.get("code").and_then(|c| c.as_str()) {
                context.error_code = Some(code.to_string());
            }

            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown OpenAI error")
        }
        None => json
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error"),
    };

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ServiceError::validation(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        _ => ServiceError::service(message),
    }
}

/// Map a GitHub REST API error to a ServiceError
///
/// GitHub signals primary rate limits as `403` with an exhausted
/// `x-ratelimit-remaining` header, so the header value is expected in the
/// context under `ratelimit_remaining` when the caller saw it.
pub fn map_github_error(status: StatusCode, json: &Value, context: &mut ErrorContext) -> ServiceError {
    context.service = "github".to_string();

    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown GitHub error");

    if let Some(doc) = json.get("documentation_url").and_then(|d| d.as_str()) {
        context.add("documentation_url", doc);
    }

    let exhausted = context
        .data
        .get("ratelimit_remaining")
        .map(|remaining| remaining == "0")
        .unwrap_or(false);
    let mentions_rate_limit = message.to_lowercase().contains("rate limit");

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN if exhausted || mentions_rate_limit => ServiceError::rate_limit(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::CONFLICT => ServiceError::conflict(message),
        // An existing path written without a sha comes back as 422 "sha wasn't supplied"
        StatusCode::UNPROCESSABLE_ENTITY if message.contains("sha") => ServiceError::conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ServiceError::validation(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        _ => ServiceError::service(message),
    }
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        match context.service.as_str() {
            "openai" => return map_openai_error(status, &json, context),
            "github" => return map_github_error(status, &json, context),
            _ => {}
        }
    }

    // Fallback to status-based mapping
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, crate::util::truncate_string(body, 100))
    };

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::CONFLICT => ServiceError::conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ServiceError::validation(message),
        StatusCode::NOT_FOUND => ServiceError::not_found(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        _ => ServiceError::service(message),
    }
}

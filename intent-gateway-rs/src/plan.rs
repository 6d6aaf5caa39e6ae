//! Plan generation
//!
//! Sends the intent to the reasoning service and decodes its answer. The
//! completion text is untrusted: it is decoded, then validated, and every
//! failure comes back as a `PlanGenerationError` with a reason code. Nothing
//! here retries; transport retries live inside the service client.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use maintainer_sdk::openai::OpenAIClient;
use maintainer_sdk::{ErrorKind, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::intent::Intent;

/// Instruction sent as the system message of every plan request
pub const SYSTEM_INSTRUCTION: &str = "You are Jarvis Maintainer. Output STRICT JSON with keys: goal, \
affected_repos, scope, risk. You may add definition_of_done as an array of strings.";

/// Default sampling temperature for plan extraction
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Structured extraction of an intent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    #[serde(default)]
    pub affected_repos: Vec<String>,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub definition_of_done: Vec<String>,
}

/// Why a plan could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFailureReason {
    /// Transport, timeout, rate limit or 5xx calling the service
    Transport,
    /// The service refused the call
    UpstreamRejected,
    /// The completion carried no text
    EmptyResponse,
    /// Text that is not a JSON object
    MalformedOutput,
    /// A JSON object without a usable goal
    MissingGoal,
}

impl PlanFailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            PlanFailureReason::Transport => "transport",
            PlanFailureReason::UpstreamRejected => "upstream_rejected",
            PlanFailureReason::EmptyResponse => "empty_response",
            PlanFailureReason::MalformedOutput => "malformed_output",
            PlanFailureReason::MissingGoal => "missing_goal",
        }
    }
}

impl fmt::Display for PlanFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Error)]
#[error("plan generation failed ({reason}): {message}")]
pub struct PlanGenerationError {
    pub reason: PlanFailureReason,
    pub message: String,
    /// The transport failure was a timeout
    pub timed_out: bool,
}

impl PlanGenerationError {
    pub fn new(reason: PlanFailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            timed_out: false,
        }
    }

    /// Classify a reasoning-service failure
    pub fn from_service(err: &ServiceError) -> Self {
        let message = maintainer_sdk::util::sanitize_for_logging(err.message());

        match err.kind() {
            ErrorKind::Timeout => Self {
                timed_out: true,
                ..Self::new(PlanFailureReason::Transport, message)
            },
            ErrorKind::Network
            | ErrorKind::RateLimit
            | ErrorKind::Service
            | ErrorKind::CircuitBroken
            | ErrorKind::Internal => Self::new(PlanFailureReason::Transport, message),
            ErrorKind::Parsing => Self::new(PlanFailureReason::MalformedOutput, message),
            ErrorKind::Authentication
            | ErrorKind::Authorization
            | ErrorKind::Validation
            | ErrorKind::NotFound
            | ErrorKind::Conflict
            | ErrorKind::Configuration => Self::new(PlanFailureReason::UpstreamRejected, message),
        }
    }
}

/// Seam to the natural-language model
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Complete a system + user prompt; `None` when the model produced no text
    async fn generate_text(&self, system: &str, user: &str, temperature: f32) -> Result<Option<String>, ServiceError>;
}

#[async_trait]
impl ReasoningService for OpenAIClient {
    async fn generate_text(&self, system: &str, user: &str, temperature: f32) -> Result<Option<String>, ServiceError> {
        self.complete_json(system, user, Some(temperature)).await
    }
}

/// Turns intents into plans through a `ReasoningService`
#[derive(Clone)]
pub struct PlanGenerator {
    service: Arc<dyn ReasoningService>,
    temperature: f32,
}

impl fmt::Debug for PlanGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanGenerator")
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl PlanGenerator {
    pub fn new(service: Arc<dyn ReasoningService>) -> Self {
        Self {
            service,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ask the reasoning service for a plan and decode its answer
    pub async fn generate(&self, intent: &Intent) -> Result<Plan, PlanGenerationError> {
        let text = self
            .service
            .generate_text(SYSTEM_INSTRUCTION, intent.as_str(), self.temperature)
            .await
            .map_err(|e| {
                warn!("Reasoning service call failed: {}", e);
                PlanGenerationError::from_service(&e)
            })?;

        let text = text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PlanGenerationError::new(PlanFailureReason::EmptyResponse, "model returned no text"))?;

        decode_plan(&text).map_err(|e| {
            debug!(
                "Rejected model output ({}): {}",
                e.reason,
                maintainer_sdk::util::truncate_string(&text, 200)
            );
            e
        })
    }
}

/// Strip surrounding whitespace and one enclosing Markdown code fence
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let inner = match trimmed.strip_prefix("```").and_then(|rest| rest.strip_suffix("```")) {
        Some(inner) => inner,
        None => return trimmed,
    };

    // Drop an info string such as `json` on the opening line
    match inner.split_once('\n') {
        Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body.trim(),
        _ => inner.trim(),
    }
}

/// Decode model output into a `Plan`
///
/// The text must be a JSON object with a non-empty string `goal`. Other
/// fields degrade to empty values when absent or of an unexpected type;
/// `affected_repos` and `definition_of_done` also accept a single string.
pub fn decode_plan(text: &str) -> Result<Plan, PlanGenerationError> {
    let value: Value = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        PlanGenerationError::new(PlanFailureReason::MalformedOutput, format!("model output is not JSON: {}", e))
    })?;

    let object = value.as_object().ok_or_else(|| {
        PlanGenerationError::new(PlanFailureReason::MalformedOutput, "model output is not a JSON object")
    })?;

    let goal = text_field(object, "goal")
        .ok_or_else(|| PlanGenerationError::new(PlanFailureReason::MissingGoal, "model output has no goal"))?;

    Ok(Plan {
        goal,
        affected_repos: list_field(object, "affected_repos"),
        scope: text_field(object, "scope").unwrap_or_default(),
        risk: text_field(object, "risk").unwrap_or_default(),
        definition_of_done: list_field(object, "definition_of_done"),
    })
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn list_field(object: &Map<String, Value>, key: &str) -> Vec<String> {
    let items: Vec<&str> = match object.get(key) {
        Some(Value::String(single)) => vec![single.as_str()],
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

//! Intent validation
//!
//! The first line of defense: turns an untyped request payload into an
//! `Intent` or a `ValidationError` naming the violated constraint. Lengths
//! are counted in Unicode scalar values after trimming.

use serde_json::Value;
use thiserror::Error;

/// Default minimum intent length
pub const DEFAULT_MIN_LENGTH: usize = 5;

/// Default maximum intent length
pub const DEFAULT_MAX_LENGTH: usize = 4000;

/// Name of the payload field carrying the intent
pub const INTENT_FIELD: &str = "intent";

/// A validated, trimmed change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent(String);

impl Intent {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First non-blank line, used where a one-line summary is needed
    pub fn first_line(&self) -> &str {
        self.0
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

/// Reasons an intent payload is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("intent is too short: {actual} characters, minimum is {min}")]
    TooShort { min: usize, actual: usize },

    #[error("intent is too long: {actual} characters, maximum is {max}")]
    TooLong { max: usize, actual: usize },
}

impl ValidationError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MalformedBody(_) => "malformed_body",
            ValidationError::NotAnObject => "not_an_object",
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::WrongType { .. } => "wrong_type",
            ValidationError::TooShort { .. } => "too_short",
            ValidationError::TooLong { .. } => "too_long",
        }
    }
}

/// Validates raw intent payloads against length bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentValidator {
    min_length: usize,
    max_length: usize,
}

impl Default for IntentValidator {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl IntentValidator {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self { min_length, max_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Validate a decoded JSON payload
    pub fn validate(&self, raw: &Value) -> Result<Intent, ValidationError> {
        let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;

        let text = match object.get(INTENT_FIELD) {
            None | Some(Value::Null) => return Err(ValidationError::MissingField(INTENT_FIELD)),
            Some(Value::String(text)) => text.trim(),
            Some(_) => {
                return Err(ValidationError::WrongType {
                    field: INTENT_FIELD,
                    expected: "string",
                })
            }
        };

        let actual = text.chars().count();
        if actual < self.min_length {
            return Err(ValidationError::TooShort {
                min: self.min_length,
                actual,
            });
        }
        if actual > self.max_length {
            return Err(ValidationError::TooLong {
                max: self.max_length,
                actual,
            });
        }

        Ok(Intent(text.to_string()))
    }

    /// Decode a request body and validate it
    pub fn validate_bytes(&self, body: &[u8]) -> Result<Intent, ValidationError> {
        let raw: Value = serde_json::from_slice(body).map_err(|e| {
            let reason = if body.iter().all(u8::is_ascii_whitespace) {
                "empty body".to_string()
            } else {
                e.to_string()
            };
            ValidationError::MalformedBody(reason)
        })?;

        self.validate(&raw)
    }
}

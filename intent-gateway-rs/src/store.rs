//! Durable storage of request records
//!
//! `RecordStore` sits on a path-addressed, version-controlled
//! `ContentBackend`. Overwrites need the current revision; a conflicting
//! write is retried once with a freshly fetched revision, so one `put`
//! issues at most two writes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use maintainer_sdk::github::GitHubClient;
use maintainer_sdk::util::{sanitize_for_logging, truncate_string};
use maintainer_sdk::{ErrorKind, ServiceError};
use serde::Serialize;
use thiserror::Error;

use crate::render::Record;

/// Maximum commit message length in characters
pub const COMMIT_MESSAGE_LIMIT: usize = 72;

/// Result of a successful backend write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// New revision of the written path
    pub revision: String,
    pub commit_sha: Option<String>,
    pub html_url: Option<String>,
}

/// Path-addressed content backend with revision-checked writes
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Current revision of `path`, `None` when nothing is stored there
    async fn fetch_revision(&self, path: &str) -> Result<Option<String>, ServiceError>;

    /// Write a new path; conflicts when the path already exists
    async fn create_at(&self, path: &str, content: &str, message: &str) -> Result<WriteOutcome, ServiceError>;

    /// Overwrite `path`; conflicts when `revision` is stale
    async fn update_at(
        &self,
        path: &str,
        content: &str,
        message: &str,
        revision: &str,
    ) -> Result<WriteOutcome, ServiceError>;
}

async fn write_contents(
    client: &GitHubClient,
    path: &str,
    content: &str,
    message: &str,
    revision: Option<&str>,
) -> Result<WriteOutcome, ServiceError> {
    let response = client.put_contents(path, content, message, revision).await?;
    let (revision, html_url) = match response.content {
        Some(meta) => (meta.sha, meta.html_url),
        None => (String::new(), None),
    };

    Ok(WriteOutcome {
        revision,
        commit_sha: Some(response.commit.sha),
        html_url: html_url.or(response.commit.html_url),
    })
}

#[async_trait]
impl ContentBackend for GitHubClient {
    async fn fetch_revision(&self, path: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.get_contents(path).await?.map(|meta| meta.sha))
    }

    async fn create_at(&self, path: &str, content: &str, message: &str) -> Result<WriteOutcome, ServiceError> {
        write_contents(self, path, content, message, None).await
    }

    async fn update_at(
        &self,
        path: &str,
        content: &str,
        message: &str,
        revision: &str,
    ) -> Result<WriteOutcome, ServiceError> {
        write_contents(self, path, content, message, Some(revision)).await
    }
}

/// Why a record could not be stored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("record store refused the credentials: {0}")]
    Unauthorized(String),

    #[error("conflicting write to {path}: {message}")]
    Conflict { path: String, message: String },

    #[error("record store rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("record store unreachable: {0}")]
    Network(String),

    #[error("record store rejected the write: {0}")]
    Rejected(String),
}

impl PersistenceError {
    pub fn kind(&self) -> &'static str {
        match self {
            PersistenceError::Unauthorized(_) => "unauthorized",
            PersistenceError::Conflict { .. } => "conflict",
            PersistenceError::RateLimited(_) => "rate_limited",
            PersistenceError::Network(_) => "network",
            PersistenceError::Rejected(_) => "rejected",
        }
    }

    /// Classify a backend failure for `path`
    pub fn from_service(path: &str, err: &ServiceError) -> Self {
        let message = sanitize_for_logging(err.message());

        match err.kind() {
            ErrorKind::Authentication | ErrorKind::Authorization => PersistenceError::Unauthorized(message),
            ErrorKind::Conflict => PersistenceError::Conflict {
                path: path.to_string(),
                message,
            },
            ErrorKind::RateLimit => PersistenceError::RateLimited(message),
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::CircuitBroken => PersistenceError::Network(message),
            ErrorKind::Service if err.is_retryable() => PersistenceError::Network(message),
            _ => PersistenceError::Rejected(message),
        }
    }
}

/// Confirmation of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreReceipt {
    pub path: String,
    pub revision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    /// The write created the path rather than replacing it
    pub created: bool,
}

/// Commit message for `record`
pub fn commit_message(record: &Record) -> String {
    let line = format!("{}: {}", record.title, record.summary);
    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_string(&line, COMMIT_MESSAGE_LIMIT)
}

/// Persists rendered records through a `ContentBackend`
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn ContentBackend>,
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        Self { backend }
    }

    /// Store a record at a fresh path
    pub async fn put(&self, record: &Record) -> Result<StoreReceipt, PersistenceError> {
        let message = commit_message(record);
        debug!("Creating {}", record.path);

        match self.backend.create_at(&record.path, &record.body, &message).await {
            Ok(outcome) => Ok(self.receipt(record, outcome, true)),
            Err(e) if e.kind() == ErrorKind::Conflict => {
                warn!("Create of {} conflicted, retrying with current revision", record.path);
                self.retry_with_current_revision(record, &message).await
            }
            Err(e) => Err(self.failure(record, &e)),
        }
    }

    /// Overwrite the record at its path, creating it when absent
    pub async fn replace(&self, record: &Record) -> Result<StoreReceipt, PersistenceError> {
        let message = commit_message(record);
        let revision = self.current_revision(record).await?;

        let result = match &revision {
            Some(revision) => {
                self.backend
                    .update_at(&record.path, &record.body, &message, revision)
                    .await
            }
            None => self.backend.create_at(&record.path, &record.body, &message).await,
        };

        match result {
            Ok(outcome) => Ok(self.receipt(record, outcome, revision.is_none())),
            Err(e) if e.kind() == ErrorKind::Conflict => {
                warn!("Replace of {} conflicted, retrying with current revision", record.path);
                self.retry_with_current_revision(record, &message).await
            }
            Err(e) => Err(self.failure(record, &e)),
        }
    }

    /// The single conflict retry: refresh the revision and write once more
    async fn retry_with_current_revision(
        &self,
        record: &Record,
        message: &str,
    ) -> Result<StoreReceipt, PersistenceError> {
        let revision = self.current_revision(record).await?;

        let result = match &revision {
            Some(revision) => {
                self.backend
                    .update_at(&record.path, &record.body, message, revision)
                    .await
            }
            None => self.backend.create_at(&record.path, &record.body, message).await,
        };

        result
            .map(|outcome| self.receipt(record, outcome, revision.is_none()))
            .map_err(|e| self.failure(record, &e))
    }

    async fn current_revision(&self, record: &Record) -> Result<Option<String>, PersistenceError> {
        self.backend
            .fetch_revision(&record.path)
            .await
            .map_err(|e| self.failure(record, &e))
    }

    fn receipt(&self, record: &Record, outcome: WriteOutcome, created: bool) -> StoreReceipt {
        info!("Stored {} (revision {})", record.path, outcome.revision);
        StoreReceipt {
            path: record.path.clone(),
            revision: outcome.revision,
            commit_sha: outcome.commit_sha,
            html_url: outcome.html_url,
            created,
        }
    }

    fn failure(&self, record: &Record, err: &ServiceError) -> PersistenceError {
        let error = PersistenceError::from_service(&record.path, err);
        warn!("Storing {} failed: {}", record.path, error);
        error
    }
}

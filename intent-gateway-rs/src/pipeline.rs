//! The intent processing pipeline
//!
//! Validation, plan generation, id allocation, rendering and persistence,
//! in that order. The first failing stage ends the run. The pipeline keeps
//! no state between runs beyond the id allocator, so runs may overlap.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::intent::{Intent, IntentValidator, ValidationError};
use crate::plan::{PlanGenerationError, PlanGenerator};
use crate::render::{DocumentRenderer, Record};
use crate::request_id::{RequestId, RequestIdAllocator};
use crate::store::{PersistenceError, RecordStore};

/// Where record content comes from, chosen at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    /// Ask the reasoning service for a plan
    #[default]
    Reasoned,
    /// Record the intent as submitted
    Verbatim,
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanMode::Reasoned => f.write_str("reasoned"),
            PlanMode::Verbatim => f.write_str("verbatim"),
        }
    }
}

impl FromStr for PlanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reasoned" => Ok(PlanMode::Reasoned),
            "verbatim" => Ok(PlanMode::Verbatim),
            other => Err(format!("unknown plan mode: {} (expected reasoned or verbatim)", other)),
        }
    }
}

/// Plan source matching a `PlanMode`
#[derive(Debug, Clone)]
pub enum PlanSource {
    Reasoned(PlanGenerator),
    Verbatim,
}

impl PlanSource {
    pub fn mode(&self) -> PlanMode {
        match self {
            PlanSource::Reasoned(_) => PlanMode::Reasoned,
            PlanSource::Verbatim => PlanMode::Verbatim,
        }
    }
}

/// Caller-facing confirmation of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub id: RequestId,
    pub path: String,
    pub body: String,
    pub revision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

/// A pipeline failure tagged with the stage that produced it
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PlanGeneration(#[from] PlanGenerationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::PlanGeneration(_) => "plan_generation",
            PipelineError::Persistence(_) => "persistence",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(e) => e.kind(),
            PipelineError::PlanGeneration(e) => e.reason.code(),
            PipelineError::Persistence(e) => e.kind(),
        }
    }
}

/// Runs intents through every stage up to a stored record
#[derive(Debug, Clone)]
pub struct Pipeline {
    validator: IntentValidator,
    source: PlanSource,
    allocator: Arc<RequestIdAllocator>,
    renderer: DocumentRenderer,
    store: RecordStore,
}

impl Pipeline {
    pub fn new(validator: IntentValidator, source: PlanSource, store: RecordStore) -> Self {
        Self::with_allocator(validator, source, store, Arc::new(RequestIdAllocator::new()))
    }

    pub fn with_allocator(
        validator: IntentValidator,
        source: PlanSource,
        store: RecordStore,
        allocator: Arc<RequestIdAllocator>,
    ) -> Self {
        Self {
            validator,
            source,
            allocator,
            renderer: DocumentRenderer::new(),
            store,
        }
    }

    pub fn mode(&self) -> PlanMode {
        self.source.mode()
    }

    /// Process a raw request body
    pub async fn process_bytes(&self, body: &[u8]) -> Result<Receipt, PipelineError> {
        let intent = self.validator.validate_bytes(body).map_err(|e| {
            info!("Rejected intent: {}", e);
            e
        })?;
        self.run(intent).await
    }

    /// Process a decoded JSON payload
    pub async fn process(&self, raw: &Value) -> Result<Receipt, PipelineError> {
        let intent = self.validator.validate(raw).map_err(|e| {
            info!("Rejected intent: {}", e);
            e
        })?;
        self.run(intent).await
    }

    async fn run(&self, intent: Intent) -> Result<Receipt, PipelineError> {
        let record = self.build_record(&intent).await?;
        let id = record.id;

        let stored = self.store.put(&record).await.map_err(|e| {
            error!("[{}] Persistence failed: {}", id, e);
            e
        })?;

        info!("[{}] Stored request at {}", id, stored.path);
        Ok(Receipt {
            id,
            path: stored.path,
            body: record.body,
            revision: stored.revision,
            commit_sha: stored.commit_sha,
        })
    }

    /// Plan (when reasoned), then allocate the id and render
    async fn build_record(&self, intent: &Intent) -> Result<Record, PipelineError> {
        match &self.source {
            PlanSource::Reasoned(generator) => {
                let plan = generator.generate(intent).await.map_err(|e| {
                    error!("Plan generation failed: {}", e);
                    e
                })?;
                let id = self.allocator.allocate();
                info!("[{}] Plan ready: {}", id, plan.goal);
                Ok(self.renderer.render(&id, &plan))
            }
            PlanSource::Verbatim => {
                let id = self.allocator.allocate();
                info!("[{}] Recording intent verbatim", id);
                Ok(self.renderer.render_verbatim(&id, intent))
            }
        }
    }
}

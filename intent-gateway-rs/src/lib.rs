//! Intent Gateway
//!
//! Accepts natural-language change requests over HTTP, turns each into a
//! structured plan through a reasoning service, renders it as a Markdown
//! record and commits the record to a repository.

pub mod intent;
pub mod pipeline;
pub mod plan;
pub mod render;
pub mod request_id;
pub mod routes;
pub mod settings;
pub mod store;

pub use intent::{Intent, IntentValidator, ValidationError};
pub use pipeline::{Pipeline, PipelineError, PlanMode, PlanSource, Receipt};
pub use plan::{Plan, PlanFailureReason, PlanGenerationError, PlanGenerator, ReasoningService};
pub use render::{DocumentRenderer, Record};
pub use request_id::{RequestId, RequestIdAllocator};
pub use routes::{router, AppState};
pub use settings::{ConfigurationError, GatewayConfig};
pub use store::{ContentBackend, PersistenceError, RecordStore, StoreReceipt, WriteOutcome};

#[cfg(test)]
mod tests;

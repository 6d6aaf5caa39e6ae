//! HTTP surface of the gateway

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::error;
use maintainer_sdk::ServiceClient;
use once_cell::sync::Lazy;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId as HttpRequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::pipeline::{Pipeline, PipelineError};
use crate::plan::PlanFailureReason;
use crate::store::PersistenceError;

pub const SERVICE_NAME: &str = "intent-gateway";

/// Maximum accepted request body size
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

pub static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// External services reported by `/health`
    pub dependencies: Vec<Arc<dyn ServiceClient>>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, client: Arc<dyn ServiceClient>) -> Self {
        self.dependencies.push(client);
        self
    }
}

/// Successful `POST /intent` body
#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub ok: bool,
    pub id: String,
    pub request: String,
    pub request_markdown: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub stage: String,
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct DependencyStatus {
    pub name: String,
    pub circuit: String,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: u64,
    pub plan_mode: String,
    pub status: String,
    pub dependencies: Vec<DependencyStatus>,
}

/// HTTP status for a pipeline failure
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::PlanGeneration(e) => match e.reason {
            PlanFailureReason::Transport if e.timed_out => StatusCode::GATEWAY_TIMEOUT,
            PlanFailureReason::Transport => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        },
        PipelineError::Persistence(e) => match e {
            PersistenceError::RateLimited(_) | PersistenceError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            PersistenceError::Unauthorized(_) | PersistenceError::Rejected(_) => StatusCode::BAD_GATEWAY,
            PersistenceError::Conflict { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = ErrorResponse {
            error: self.to_string(),
            stage: self.stage().to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// POST /intent - Run an intent through the pipeline
///
/// The run is spawned on its own task, so a client that disconnects does
/// not cancel calls already in flight.
async fn intent_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let pipeline = state.pipeline.clone();
    let run = tokio::spawn(async move { pipeline.process_bytes(&body).await });

    match run.await {
        Ok(Ok(receipt)) => Json(IntentResponse {
            ok: true,
            id: receipt.id.to_string(),
            request: receipt.path,
            request_markdown: receipt.body,
        })
        .into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(join_error) => {
            error!("Pipeline task failed: {}", join_error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal error".to_string(),
                    stage: "internal".to_string(),
                    kind: "task_failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health - Health check endpoint
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let dependencies: Vec<DependencyStatus> = state
        .dependencies
        .iter()
        .map(|client| DependencyStatus {
            name: client.name().to_string(),
            circuit: client.circuit_status().to_string(),
            available: client.is_available(),
        })
        .collect();

    let available = dependencies.iter().filter(|d| d.available).count();
    let status = if available == dependencies.len() {
        "SERVING"
    } else if available == 0 {
        "CRITICAL"
    } else {
        "DEGRADED"
    };

    Json(HealthResponse {
        healthy: available == dependencies.len(),
        service_name: SERVICE_NAME.to_string(),
        uptime_seconds: START_TIME.elapsed().as_secs(),
        plan_mode: state.pipeline.mode().to_string(),
        status: status.to_string(),
        dependencies,
    })
}

/// GET / - Root endpoint
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "plan_mode": state.pipeline.mode(),
        "endpoints": [
            "GET /health",
            "POST /intent"
        ]
    }))
}

/// Replace the body limit's plain-text 413 with the JSON error shape
async fn payload_too_large_as_json(response: Response) -> Response {
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }

    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ErrorResponse {
            error: format!("request body exceeds {} bytes", MAX_PAYLOAD_SIZE),
            stage: "validation".to_string(),
            kind: "payload_too_large".to_string(),
        }),
    )
        .into_response()
}

/// Random correlation id for requests arriving without `x-request-id`
#[derive(Debug, Clone, Copy, Default)]
struct MakeCorrelationId;

impl MakeRequestId for MakeCorrelationId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<HttpRequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(HttpRequestId::new)
    }
}

/// Build the router with its middleware stack
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/intent", post(intent_handler))
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(middleware::map_response(payload_too_large_as_json))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeCorrelationId))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

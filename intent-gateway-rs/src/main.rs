// intent-gateway-rs/src/main.rs
// Intent Gateway - HTTP entry point of the Vesper maintainer
//
// Wires the configured reasoning service and record store into the
// pipeline and serves it until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use intent_gateway::routes::{self, AppState, START_TIME};
use intent_gateway::{GatewayConfig, IntentValidator, Pipeline, PlanGenerator, PlanSource, RecordStore};
use maintainer_sdk::config::DEFAULT_PROVIDER;
use maintainer_sdk::github::GitHubClient;
use maintainer_sdk::openai::OpenAIClient;
use maintainer_sdk::ServiceClient;
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "INTENT_GATEWAY";
const DEFAULT_PORT: u16 = 3000;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let _ = *START_TIME;

    let config = GatewayConfig::from_provider(&**DEFAULT_PROVIDER).context("failed to load configuration")?;
    log::info!(
        "Plan mode: {}, intent length {}..={}",
        config.plan_mode,
        config.min_length,
        config.max_length
    );

    let github = Arc::new(GitHubClient::new(config.github.clone()).context("failed to build GitHub client")?);
    log::info!("Recording requests in {}", github.repository());

    let mut dependencies: Vec<Arc<dyn ServiceClient>> = vec![github.clone() as Arc<dyn ServiceClient>];

    let source = match config.openai.clone() {
        Some(openai_config) => {
            let openai = Arc::new(OpenAIClient::new(openai_config).context("failed to build OpenAI client")?);
            log::info!("Using model {}", openai.model());
            let generator = PlanGenerator::new(openai.clone()).with_temperature(openai.temperature());
            dependencies.push(openai);
            PlanSource::Reasoned(generator)
        }
        None => PlanSource::Verbatim,
    };

    let pipeline = Pipeline::new(
        IntentValidator::new(config.min_length, config.max_length),
        source,
        RecordStore::new(github),
    );

    let state = dependencies
        .into_iter()
        .fold(AppState::new(Arc::new(pipeline)), AppState::with_dependency);
    let app = routes::router(state);

    let addr = config_rs::get_bind_address(SERVICE_NAME, DEFAULT_PORT);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        "{} listening on {}",
        config_rs::get_formatted_service_name(SERVICE_NAME),
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

mod batch;
mod communication;
mod config;
mod db;
mod errors;
mod extraction;
mod ingest;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod test_support;
mod workflow;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::communication::SesTransport;
use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::ExtractionGateway;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting recruitflow API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite and apply migrations
    let store = RecordStore::new(create_pool(&config.database_url).await?);

    // One completion client and one gateway for the whole process
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let gateway = Arc::new(ExtractionGateway::new(Arc::new(llm)));

    // Initialize SES transport
    let transport = Arc::new(
        SesTransport::from_env(
            config.email_from_address.clone(),
            config.email_region.clone(),
        )
        .await,
    );
    info!("SES transport initialized (region: {})", config.email_region);

    let state = AppState::new(config.clone(), store, gateway, transport);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

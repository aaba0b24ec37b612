mod config;
mod download;
mod error;
mod intake;
mod models;
mod openai;
mod photo;
mod pipeline;
mod prompts;
mod routes;
mod screen;

use anyhow::Context;
use routes::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::Config, openai::OpenAiClient, pipeline::StoryModel, screen::Visits};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    tracing::info!("Using API key: {}", config.masked_key());
    let model = OpenAiClient::from_config(&config).map(|client| Arc::new(client) as Arc<dyn StoryModel>);
    if model.is_none() {
        tracing::warn!("⚠️ OPENAI_API_KEY is not set; every story will end in the configuration error");
    }

    let state = AppState {
        visits: Visits::default(),
        model,
    };

    let app = create_router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

//! # hsse-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the compliance workflow engine.
//! Binds to `HSSE_HOST:HSSE_PORT` (default `0.0.0.0:8080`).

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use hsse_api::state::{AppConfig, AppState, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let addr = config.bind_addr();
    let app = hsse_api::app(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HSSE API listening on {}", addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

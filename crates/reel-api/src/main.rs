//! # reel-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Reel catalogue API.
//! Binds to configurable port (default 4000).

use reel_api::config::{AppConfig, LIMITER_SWEEP_INTERVAL};
use reel_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState::new(config);
    state.limiter.start_sweeper(LIMITER_SWEEP_INTERVAL);
    let tasks = state.tasks.clone();

    tracing::info!(
        %addr,
        environment = %state.config.environment,
        "starting server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind {addr}: {e}");
        e
    })?;

    let app = reel_api::app(state);
    reel_api::server::serve(listener, app, tasks).await?;

    Ok(())
}

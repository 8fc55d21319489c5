//! `splitlens serve`: the HTTP analysis service.
//!
//! Startup sequence:
//! 1. Build the credential pool from config
//! 2. Create the completion client
//! 3. Bind and serve until Ctrl+C
//!
//! Every request picks its own credential; nothing else is shared mutably.

mod error;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use splitlens_core::config::Config;
use splitlens_providers::{CompletionClient, KeyPool};

use crate::helpers;

use state::AppState;

/// Build the service router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/config", get(handlers::config))
        .route("/api/health", get(handlers::health))
        .route("/api/test-provider", get(handlers::test_provider))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the service until Ctrl+C.
pub async fn run(config: Config) -> Result<()> {
    helpers::print_banner("Service");

    let pool = KeyPool::from_settings(&config.provider);
    if pool.available() {
        info!(
            pool_size = pool.size(),
            rotation = pool.rotation_enabled(),
            "Server credential pool ready"
        );
    } else {
        warn!("No server credentials configured; callers must supply their own key");
    }

    let client = CompletionClient::new(&config.provider)
        .context("failed to build completion client")?;
    let state = AppState::new(pool, Arc::new(client));
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!("  Listening on http://{addr}");
    println!("  Press Ctrl+C to stop.");
    println!();
    info!(%addr, model = %config.provider.model, "Service started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, shutting down");
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

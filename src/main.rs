use std::env;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use campus_answers::core::logging;
use campus_answers::server::router;
use campus_answers::state::AppState;

/// How often the background task sweeps idle sessions and checkpoints the
/// embedding cache.
const MAINTENANCE_INTERVAL_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize()
        .await
        .map_err(|e| anyhow::anyhow!("failed to initialize: {}", e))?;
    logging::init(&state.paths);

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(state.config.server.port);
    let bind_addr = format!("{}:{}", state.config.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    spawn_maintenance(state.clone());

    let app: Router = router::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Final checkpoint so a restart starts from a warm cache.
    if let Err(err) = state.cache.flush().await {
        tracing::warn!("Failed to checkpoint embedding cache on shutdown: {}", err);
    }

    Ok(())
}

fn spawn_maintenance(state: std::sync::Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(MAINTENANCE_INTERVAL_SECS));
        interval.tick().await;
        loop {
            interval.tick().await;

            let evicted = state.sessions.evict_expired().await;
            if evicted > 0 {
                tracing::info!("Evicted {} idle sessions", evicted);
            }

            if let Err(err) = state.cache.flush().await {
                tracing::warn!("Failed to checkpoint embedding cache: {}", err);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}

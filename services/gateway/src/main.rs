mod config;
mod error;
mod handlers;
mod logging;
mod models;
mod orchestrator;
mod router;
mod state;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use router::create_router;
use state::AppState;
use tokio::net::TcpListener;

use crate::config::{GatewayConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = GatewayConfig::load(Some(config_path.as_path()))?;

    logging::init_tracing(config.logging.json)?;
    tracing::info!(config = %config_path.display(), "Starting bullion execution gateway");

    let state = AppState::in_memory(&config)?;
    spawn_reconciliation(state.clone(), Duration::from_secs(config.reconciliation.interval_secs));

    let app = create_router(state);

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;

    tracing::info!("Listening on {}", config.server.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodic ledger-vs-journal sweep; drift is logged by the sweep itself
fn spawn_reconciliation(state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            match state.reconciliation.run(state.store.as_ref()) {
                Ok(reports) => {
                    let drifted = reports.iter().filter(|r| !r.is_clean()).count();
                    let persistent = reports.iter().filter(|r| r.persistent_drift).count();
                    tracing::debug!(
                        metals = reports.len(),
                        drifted,
                        persistent,
                        "Reconciliation sweep finished"
                    );
                }
                Err(e) => tracing::warn!(error = %e, "Reconciliation sweep failed"),
            }
        }
    });
}

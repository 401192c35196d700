//! `packtrack serve`

use anyhow::{Context, Result, anyhow};
use packtrack_core::config::AppConfig;
use packtrack_db::open_store;
use packtrack_http::{AppState, HttpIngress};

pub async fn run_serve_command(mut config: AppConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.bind = bind;
    }
    let addr = config.bind_addr().context("Invalid listen address")?;

    let store = open_store(&config)
        .await
        .context("Failed to open the record store")?;
    if config.passcode.is_none() {
        tracing::warn!("No passcode configured, attendance and log routes are open");
    }

    let state = AppState::new(store, config.passcode.clone());
    HttpIngress::new(state)
        .bind(addr.to_string())
        .run_until(shutdown_signal())
        .await
        .map_err(|e| anyhow!(e))
        .context("HTTP server failed")?;

    tracing::info!("packtrack stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

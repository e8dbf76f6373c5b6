//! `website-monitor run` — the default, long-running command.
//!
//! Boots the full `AppState`, starts the Scheduler Core (unless
//! `scheduler_enabled` is false) and the Queue Processor as background
//! tasks, then blocks until a shutdown signal arrives.

use std::sync::Arc;

use wm_domain::config::Config;

use crate::bootstrap::build_app_state;

pub async fn run(config: Arc<Config>) -> anyhow::Result<()> {
    let state = build_app_state(config)?;

    if state.config.scheduler.scheduler_enabled {
        state.scheduler.start()?;
        tracing::info!("scheduler started");
    } else {
        tracing::warn!("scheduler_enabled is false; scheduled checks will not run");
    }

    state.queue.start();
    tracing::info!("queue processor started");

    shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping");

    state.queue.stop().await;
    state.scheduler.stop().await?;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("installing SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("installing SIGINT handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

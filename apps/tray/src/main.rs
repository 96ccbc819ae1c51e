//! GlazeTray entry point.
//!
//! Mirrors the focused GlazeWM workspace as a tray icon: subscribes to
//! the window manager's event stream, re-queries the monitor topology on
//! each event, and publishes the matching icon for the tray toolkit.

mod config;
mod shell;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use glazetray_tracker::WorkspaceTracker;
use glazetray_wm_client::ConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting glazetray");

    // Load configuration.
    let cfg = match config::TrayConfig::load() {
        Ok(c) => {
            tracing::info!(endpoint = %c.endpoint, "configuration loaded");
            c
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            config::TrayConfig::default()
        }
    };

    let manager = Arc::new(ConnectionManager::new(cfg.endpoint.clone()));
    let events_rx = manager
        .take_events()
        .await
        .context("event receiver already taken")?;

    let cancel = CancellationToken::new();
    let (tracker, indicator_rx) =
        WorkspaceTracker::new(manager.clone(), cfg.events.clone(), cancel.clone());

    let icon_loop = tokio::spawn(shell::run_icon_loop(
        shell::IconTheme::new(cfg.icon_dir.clone()),
        indicator_rx,
    ));

    // The tracker publishes the error indicator on the Down event a
    // failed connect emits; the backoff loop keeps retrying from there.
    if manager.connect().await.is_err() {
        manager.start_reconnect();
    }

    tokio::select! {
        _ = tracker.run(events_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("quit requested");
        }
    }

    cancel.cancel();
    manager.shutdown().await;
    icon_loop.abort();

    Ok(())
}

use std::path::PathBuf;

use chrono::Utc;
use subathon_core::{AppConfig, Recovery};
use subathon_server::service::{TimerAuthority, TimerService};
use subathon_server::{feed, logging, router};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), String> {
    // Optional first argument: an explicit config file path.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let loaded = match &config_path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    let data_dir = config.data_dir();
    let _log_guard = logging::init_logging(&data_dir);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Config unusable, continuing with defaults");
    }
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    let store = config.snapshot_store();
    let (authority, recovery) = TimerAuthority::restore(&store, config.grants.clone(), Utc::now());
    let remaining = authority.snapshot().timer.remaining_seconds();
    match recovery {
        Recovery::Fresh => tracing::info!(path = %store.path().display(), "No snapshot, starting fresh"),
        Recovery::Stopped => tracing::info!(remaining, "Restored paused timer"),
        Recovery::Resumed { elapsed } => {
            tracing::info!(remaining, elapsed, "Restored running timer, downtime subtracted")
        }
        Recovery::ExpiredWhileDown { elapsed } => {
            tracing::warn!(elapsed, "Timer ran out while the server was down")
        }
    }

    let (handle, service_task) = TimerService::spawn(authority, store);

    if let Some(feed_path) = config.feed_path.clone() {
        tokio::spawn(feed::follow(feed_path, handle.clone(), feed::DEFAULT_POLL));
    }

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.listen_addr))?;
    let channel = if config.channel.is_empty() {
        "not configured"
    } else {
        config.channel.as_str()
    };
    tracing::info!(addr = %config.listen_addr, channel, "Subathon timer listening");

    let served = axum::serve(listener, router::router(handle.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server failed");
    }

    if handle.shutdown().await.is_ok() {
        let _ = service_task.await;
    }
    served.map_err(|e| e.to_string())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

//! # wx-server
//!
//! HTTP service for the weather station sync engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          wx-server Process                              │
//! │                                                                         │
//! │  Client ───► HTTP (5000) ───► Router ───► SyncOrchestrator ───► SQLite │
//! │                                  │               │                      │
//! │                                  ▼               ▼                      │
//! │                            SnapshotSlot ◄── WeatherLink API             │
//! │                                  ▲                                      │
//! │                                  │                                      │
//! │                     RefreshScheduler (every N seconds)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wx_db::{Database, DbConfig};
use wx_server::{router, AppState};
use wx_sync::{RefreshScheduler, WeatherLinkClient, WxConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting wx-server...");

    // Load configuration
    let config = WxConfig::load(None)?;
    info!(
        port = config.server.port,
        database = %config.database.path.display(),
        station = %config.api.station_name,
        "Configuration loaded"
    );

    // Open the store (migrations run on connect)
    let db = Database::new(
        DbConfig::new(config.database.path.clone()).max_connections(config.database.max_connections),
    )
    .await?;
    info!("Database ready");

    // Wire the sync engine
    let source = Arc::new(WeatherLinkClient::new(&config.api)?);
    let state = Arc::new(AppState::new(db.clone(), source, &config));

    // The first tick fires immediately, so the snapshot is fetched at startup
    let (scheduler, scheduler_handle) =
        RefreshScheduler::new(state.updater.clone(), config.snapshot.refresh_interval());
    let scheduler_task = tokio::spawn(scheduler.run());

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = scheduler_handle.shutdown().await {
        error!(error = %e, "Failed to stop refresh scheduler");
    }
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Refresh scheduler task panicked");
    }

    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

//! # Refresh Scheduler
//!
//! Background task that asks a [`RefreshTrigger`] to refresh on a fixed
//! cadence.
//!
//! ## Timing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Refresh Cadence (period = 300s)                      │
//! │                                                                         │
//! │  t = 0      300     600     900                                        │
//! │      ●───────●───────●───────●──── …                                   │
//! │      │                                                                  │
//! │      └── first tick fires immediately (startup refresh)                │
//! │                                                                         │
//! │  • Refreshes run inline in the task, so two never overlap              │
//! │  • A refresh that outlasts a period skips the missed ticks             │
//! │  • shutdown() (or dropping every handle) ends the loop                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

/// Capability to refresh now.
#[async_trait]
pub trait RefreshTrigger: Send + Sync {
    /// Runs one refresh; failures are handled by the implementor.
    async fn trigger_refresh(&self);
}

/// Periodically invokes a [`RefreshTrigger`].
pub struct RefreshScheduler {
    trigger: Arc<dyn RefreshTrigger>,
    period: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the scheduler.
#[derive(Clone)]
pub struct RefreshSchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshSchedulerHandle {
    /// Stops the scheduler after any refresh in progress.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::Internal("Scheduler already stopped".into()))
    }
}

impl RefreshScheduler {
    /// Creates a scheduler and returns a handle.
    pub fn new(trigger: Arc<dyn RefreshTrigger>, period: Duration) -> (Self, RefreshSchedulerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let scheduler = RefreshScheduler {
            trigger,
            period,
            shutdown_rx,
        };

        (scheduler, RefreshSchedulerHandle { shutdown_tx })
    }

    /// Runs the refresh loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(period_secs = self.period.as_secs(), "Refresh scheduler starting");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Shutdown wins over a tick that is already due
                biased;

                _ = self.shutdown_rx.recv() => {
                    info!("Refresh scheduler shutting down");
                    break;
                }

                _ = interval.tick() => {
                    debug!("Refresh tick");
                    self.trigger.trigger_refresh().await;
                }
            }
        }

        info!("Refresh scheduler stopped");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # wx-sync: Sync Engine
//!
//! Keeps the local weather record store complete for requested ranges and
//! publishes the station's latest reading.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine Architecture                         │
//! │                                                                         │
//! │                    ┌──────────────────────────┐                         │
//! │                    │  WeatherSource (trait)   │                         │
//! │                    │  WeatherLinkClient       │                         │
//! │                    └────────────┬─────────────┘                         │
//! │                                 │                                       │
//! │         ┌───────────────────────┼───────────────────────┐               │
//! │         ▼                       ▼                       ▼               │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐    │
//! │  │StationResolver │  │  ChunkedFetcher    │  │  SnapshotUpdater   │    │
//! │  │                │  │                    │  │                    │    │
//! │  │ name → id      │  │ ≤ 1 day requests   │  │ current reading →  │    │
//! │  │ backoff, cache │  │ skip failed chunks │  │ SnapshotSlot       │    │
//! │  └───────┬────────┘  └─────────┬──────────┘  └─────────▲──────────┘    │
//! │          │                     │                       │               │
//! │          ▼                     ▼                       │               │
//! │  ┌─────────────────────────────────────────┐  ┌────────┴───────────┐   │
//! │  │           SyncOrchestrator              │  │ RefreshScheduler   │   │
//! │  │                                         │  │                    │   │
//! │  │ gaps → fetch → merge → insert-if-absent │  │ every N seconds    │   │
//! │  │ → read back (wx-db)                     │  │ via RefreshTrigger │   │
//! │  └─────────────────────────────────────────┘  └────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Service configuration (TOML + environment)
//! - [`error`] - Sync error types
//! - [`client`] - Upstream API trait and WeatherLink client
//! - [`resolver`] - Station identifier resolution
//! - [`fetcher`] - Day-chunked historic fetching
//! - [`orchestrator`] - Gap filling and range reads
//! - [`snapshot`] - Current snapshot slot and updater
//! - [`scheduler`] - Periodic refresh task
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wx_sync::{ChunkedFetcher, StationResolver, SyncOrchestrator, WeatherLinkClient, WxConfig};
//!
//! let config = WxConfig::load(None)?;
//! let source = Arc::new(WeatherLinkClient::new(&config.api)?);
//! let resolver = Arc::new(StationResolver::new(
//!     source.clone(),
//!     config.api.station_name.clone(),
//!     config.resolver.clone(),
//! ));
//! let orchestrator = SyncOrchestrator::new(resolver, ChunkedFetcher::new(source), db);
//!
//! let outcome = orchestrator.sync_current_station(range).await?;
//! println!("Added {} records", outcome.added);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod resolver;
pub mod scheduler;
pub mod snapshot;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{StationSummary, WeatherLinkClient, WeatherSource};
pub use config::WxConfig;
pub use error::{SyncError, SyncResult};
pub use fetcher::ChunkedFetcher;
pub use orchestrator::{SyncOrchestrator, SyncOutcome};
pub use resolver::StationResolver;
pub use scheduler::{RefreshScheduler, RefreshSchedulerHandle, RefreshTrigger};
pub use snapshot::{RefreshOutcome, SnapshotSlot, SnapshotUpdater};

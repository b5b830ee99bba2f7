//! # wx-core: Pure Sync Logic for the Weather Station Service
//!
//! This crate is the **heart** of the sync engine. It contains the time-grid
//! arithmetic and fragment merging as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        wx-sync Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/wx-server (axum)                        │   │
//! │  │        /current ──► /historic ──► /clear_database              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            wx-sync (resolver, fetcher, orchestrator)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ wx-core (THIS CRATE) ★                          │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   gaps    │  │  chunks   │  │   merge   │  │   │
//! │  │   │ TimeRange │  │GapDetector│  │ day-sized │  │ fragments │  │   │
//! │  │   │ Record    │  │ ±450s     │  │ requests  │  │ → records │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (TimeRange, SensorFragment, WeatherRecord, ...)
//! - [`gaps`] - Missing-bucket detection on the 15 minute sampling grid
//! - [`chunks`] - Splitting wide ranges into upstream-sized requests
//! - [`merge`] - Combining sensor fragments into one record per timestamp
//! - [`validation`] - Range and configuration checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use wx_core::gaps::GapDetector;
//! use wx_core::types::TimeRange;
//!
//! let range = TimeRange::new(0, 1800).unwrap();
//!
//! // Only the 900s grid point is stored locally
//! let gaps = GapDetector::default().find_gaps(range, &[900]);
//!
//! assert_eq!(gaps, vec![TimeRange::new(0, 0).unwrap(), TimeRange::new(1800, 1800).unwrap()]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod chunks;
pub mod error;
pub mod gaps;
pub mod merge;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use merge::MergedRecords;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sampling period of the upstream station (15 minutes).
pub const GRID_PERIOD_SECS: i64 = 900;

/// Distance from a grid point within which a stored sample still covers it.
///
/// Half a period, boundary inclusive. Absorbs jitter in upstream sample times.
pub const TOLERANCE_SECS: i64 = GRID_PERIOD_SECS / 2;

/// Widest span a single historic request may cover (one day).
pub const MAX_CHUNK_SECS: i64 = 24 * 60 * 60;

/// Widest span a caller may request in one historic query (30 days).
pub const MAX_RANGE_SECS: i64 = 30 * MAX_CHUNK_SECS;

/// Window served when a historic query names no bounds (7 days).
pub const DEFAULT_HISTORIC_WINDOW_SECS: i64 = 7 * MAX_CHUNK_SECS;

//! # Domain Types
//!
//! Core domain types used throughout the sync engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ SensorFragment  │   │  WeatherRecord  │   │ CurrentSnapshot │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  ts             │──►│  ts             │──►│  record         │       │
//! │  │  fields (one    │   │  station_id     │   │  refreshed_at   │       │
//! │  │  sensor group)  │   │  fields (merged)│   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   TimeRange     │   │   StationId     │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  [start, end]   │   │  opaque string  │                             │
//! │  │  inclusive      │   │  from upstream  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! A stored record is identified by `(station_id, ts)`. The store enforces
//! that pair as its primary key; records are never updated once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Epoch seconds.
pub type Timestamp = i64;

/// Sensor field name → value, exactly as the upstream reported it.
pub type FieldMap = serde_json::Map<String, Value>;

// =============================================================================
// Station Identity
// =============================================================================

/// Opaque upstream identifier of the tracked station.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    /// Wraps an upstream identifier.
    pub fn new(id: impl Into<String>) -> Self {
        StationId(id.into())
    }

    /// Returns the identifier as sent to the upstream API.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        StationId::new(id)
    }
}

impl From<String> for StationId {
    fn from(id: String) -> Self {
        StationId(id)
    }
}

// =============================================================================
// Time Range
// =============================================================================

/// Inclusive `[start, end]` span of epoch seconds.
///
/// A [`Gap`] is the same shape: a span known to have no stored sample
/// within tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// A stretch of grid points with no covering stored sample.
pub type Gap = TimeRange;

impl TimeRange {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::ReversedRange { start, end });
        }
        Ok(TimeRange { start, end })
    }

    /// Seconds between start and end, saturating at `i64::MAX`.
    #[inline]
    pub const fn span(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if `ts` lies inside the range (bounds inclusive).
    #[inline]
    pub const fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Widens the range by `pad` seconds on both sides.
    pub fn padded(&self, pad: i64) -> TimeRange {
        TimeRange {
            start: self.start.saturating_sub(pad),
            end: self.end.saturating_add(pad),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// =============================================================================
// Sensor Fragment
// =============================================================================

/// One sensor group's partial reading for one instant.
///
/// Several fragments may share a timestamp; [`crate::merge`] folds them into
/// one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFragment {
    pub ts: Timestamp,
    pub fields: FieldMap,
}

impl SensorFragment {
    /// Creates a fragment from a timestamp and its fields.
    pub fn new(ts: Timestamp, fields: FieldMap) -> Self {
        SensorFragment { ts, fields }
    }

    /// Builds a fragment from one upstream data point.
    ///
    /// The point keeps all of its keys, `ts` included, so stored blobs look
    /// like what the upstream sent. Returns `None` if the point carries no
    /// integer `ts`.
    pub fn from_data_point(point: FieldMap) -> Option<Self> {
        let ts = point.get("ts")?.as_i64()?;
        Some(SensorFragment { ts, fields: point })
    }
}

// =============================================================================
// Weather Record
// =============================================================================

/// Canonical unit of storage: one merged reading per station and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub ts: Timestamp,
    pub station_id: StationId,
    pub fields: FieldMap,
}

impl WeatherRecord {
    /// Creates a record.
    pub fn new(ts: Timestamp, station_id: StationId, fields: FieldMap) -> Self {
        WeatherRecord {
            ts,
            station_id,
            fields,
        }
    }
}

// =============================================================================
// Current Snapshot
// =============================================================================

/// The most recently published "latest reading".
///
/// Replaced wholesale on every successful refresh, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSnapshot {
    pub record: WeatherRecord,
    pub refreshed_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Remote        │  │     Station             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  RemoteTransport│  │  StationNotFound        │ │
//! │  │  ConfigLoad     │  │  RemoteStatus   │  │  StationUnavailable     │ │
//! │  │  InvalidUrl     │  │  Deserialization│  │  StationUnresolved      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Request      │  │    Store        │                              │
//! │  │                 │  │                 │                              │
//! │  │  InvalidRange   │  │  DatabaseError  │                              │
//! │  │  EmptyReading   │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use wx_core::{CoreError, ValidationError};

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid upstream base URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),


    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// Request never produced a response (connect, timeout, TLS).
    #[error("Upstream request failed: {0}")]
    RemoteTransport(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {status}")]
    RemoteStatus { status: u16 },

    /// Upstream body did not have the expected shape.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Station Errors
    // =========================================================================
    /// Directory was fetched but has no station with the configured name.
    #[error("Station '{0}' not found in the upstream directory")]
    StationNotFound(String),

    /// Every resolution attempt failed.
    #[error("Station directory unavailable after {attempts} attempts")]
    StationUnavailable { attempts: u32 },

    /// The station could not be identified, so nothing was synced.
    #[error("Station ID not found")]
    StationUnresolved,

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Requested range is reversed or wider than 30 days.
    #[error("Invalid range: {0}")]
    InvalidRange(#[from] ValidationError),

    /// Current endpoint returned no usable data point.
    #[error("Current reading contained no data")]
    EmptyReading,

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Store operation failed; a reconciliation in progress was rolled back.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<wx_db::DbError> for SyncError {
    fn from(err: wx_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyReading => SyncError::EmptyReading,
            CoreError::Validation(e) => SyncError::InvalidRange(e),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            SyncError::RemoteStatus {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else {
            SyncError::RemoteTransport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::DeserializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the operation may succeed when repeated.
    ///
    /// ## Retryable Errors
    /// - Transport failures (network issues, timeouts)
    /// - Non-success HTTP status
    /// - Malformed upstream bodies
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Station absent from the directory
    /// - Invalid ranges
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteTransport(_)
                | SyncError::RemoteStatus { .. }
                | SyncError::DeserializationFailed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
        )
    }

    /// Returns true if the caller supplied a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::InvalidRange(_))
    }
}

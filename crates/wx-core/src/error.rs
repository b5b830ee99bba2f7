//! # Error Types
//!
//! Domain-specific error types for wx-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  wx-core errors (this file)                                            │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  wx-db errors (separate crate)                                         │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  wx-sync errors (separate crate)                                       │
//! │  └── SyncError        - Remote, resolver and reconciliation failures   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → ApiError → HTTP       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core sync logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The upstream returned no data points with a usable timestamp.
    ///
    /// ## When This Occurs
    /// - The "current" endpoint answered with an empty `sensors` list
    /// - Every data point lacked an integer `ts`
    #[error("Reading contained no timestamped data points")]
    EmptyReading,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a caller's input doesn't meet requirements.
/// They are raised before any I/O so a rejected request has no side effects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Range end lies before its start.
    #[error("Range start {start} is after range end {end}")]
    ReversedRange { start: i64, end: i64 },

    /// Range spans more than the allowed maximum.
    ///
    /// ## User Workflow
    /// ```text
    /// GET /historic?start-timestamp=0&end-timestamp=2592001
    ///      │
    ///      ▼
    /// RangeTooLarge { span: 2592001, max: 2592000 }
    ///      │
    ///      ▼
    /// 400: "Time range exceeds 30 days"
    /// ```
    #[error("Range spans {span}s, maximum is {max}s")]
    RangeTooLarge { span: i64, max: i64 },

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., a URL without a scheme).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Numeric value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

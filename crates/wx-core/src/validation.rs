//! # Validation Module
//!
//! Input validation for historic queries and engine configuration.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (wx-server)                                     │
//! │  └── Query parameters must parse as integers                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── start <= end                                                      │
//! │  └── span <= 30 days                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── PRIMARY KEY (station_id, ts)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use wx_core::types::TimeRange;
//! use wx_core::validation::validate_range;
//!
//! let range = TimeRange::new(0, 2_592_000).unwrap();
//! assert!(validate_range(&range).is_ok());
//!
//! let range = TimeRange::new(0, 2_592_001).unwrap();
//! assert!(validate_range(&range).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::TimeRange;
use crate::MAX_RANGE_SECS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Range Validators
// =============================================================================

/// Validates a historic query range.
///
/// ## Rules
/// - `start <= end`
/// - `end - start <= 30 days` (2,592,000 seconds, bound inclusive)
///
/// A span too wide for `i64` is reported as `i64::MAX`.
pub fn validate_range(range: &TimeRange) -> ValidationResult<()> {
    if range.start > range.end {
        return Err(ValidationError::ReversedRange {
            start: range.start,
            end: range.end,
        });
    }

    let span = range.span();
    if span > MAX_RANGE_SECS {
        return Err(ValidationError::RangeTooLarge {
            span,
            max: MAX_RANGE_SECS,
        });
    }

    Ok(())
}

// =============================================================================
// Configuration Validators
// =============================================================================

/// Validates the display name the resolver looks for in the station directory.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_station_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "station_name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "station_name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates that a duration-like setting is positive.
pub fn validate_positive(field: &str, value: u64) -> ValidationResult<()> {
    if value == 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Gap Detection
//!
//! Finds the stretches of a requested range that have no stored sample.
//!
//! ## The Sampling Grid
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Grid Walk (P = 900s, tolerance ±450s)                │
//! │                                                                         │
//! │  range.start                                              range.end     │
//! │     │                                                         │         │
//! │     ▼                                                         ▼         │
//! │     0      900     1800     2700     3600     4500     5400             │
//! │     ●───────●───────●────────●────────●────────●────────●               │
//! │     ✓       ✗       ✗        ✓        ✗        ✗        ✗               │
//! │  (stored)                 (stored                                       │
//! │                           at 2950)                                      │
//! │                                                                         │
//! │  Gaps: [900, 1800]   ← closes one period before the covered point      │
//! │        [3600, 5400]  ← still open at the end, closes at range.end      │
//! │                                                                         │
//! │  A grid point is covered when any stored ts lies in [ts-450, ts+450].   │
//! │  Both ends of the window count.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::types::{Gap, TimeRange, Timestamp};
use crate::{GRID_PERIOD_SECS, TOLERANCE_SECS};

/// Walks the sampling grid and reports uncovered stretches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapDetector {
    period: i64,
    tolerance: i64,
}

impl Default for GapDetector {
    fn default() -> Self {
        GapDetector {
            period: GRID_PERIOD_SECS,
            tolerance: TOLERANCE_SECS,
        }
    }
}

impl GapDetector {
    /// Creates a detector for a grid of `period` seconds.
    ///
    /// Tolerance is half the period. A non-positive period falls back to the
    /// station's 900s grid.
    pub fn with_period(period: i64) -> Self {
        if period <= 0 {
            return Self::default();
        }
        GapDetector {
            period,
            tolerance: period / 2,
        }
    }

    /// Grid period in seconds.
    pub fn period(&self) -> i64 {
        self.period
    }

    /// Coverage tolerance in seconds.
    pub fn tolerance(&self) -> i64 {
        self.tolerance
    }

    /// Returns the gaps of `range`, ascending and non-overlapping.
    ///
    /// `existing` need not be sorted or deduplicated.
    pub fn find_gaps(&self, range: TimeRange, existing: &[Timestamp]) -> Vec<Gap> {
        let mut stored = existing.to_vec();
        stored.sort_unstable();
        stored.dedup();

        let mut gaps = Vec::new();
        let mut open: Option<Timestamp> = None;
        let mut ts = range.start;

        while ts <= range.end {
            if self.is_covered(&stored, ts) {
                if let Some(start) = open.take() {
                    gaps.push(Gap {
                        start,
                        end: ts - self.period,
                    });
                }
            } else if open.is_none() {
                open = Some(ts);
            }

            ts = match ts.checked_add(self.period) {
                Some(next) => next,
                None => break,
            };
        }

        if let Some(start) = open {
            gaps.push(Gap {
                start,
                end: range.end,
            });
        }

        gaps
    }

    /// Binary search for a stored ts inside `[ts - tolerance, ts + tolerance]`.
    fn is_covered(&self, sorted: &[Timestamp], ts: Timestamp) -> bool {
        let low = ts.saturating_sub(self.tolerance);
        let high = ts.saturating_add(self.tolerance);
        let idx = sorted.partition_point(|&stored| stored < low);
        sorted.get(idx).is_some_and(|&stored| stored <= high)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Chunk Planning
//!
//! Splits a range into the sub-ranges the upstream historic endpoint accepts.
//!
//! ```text
//! gap: 48h
//! ├──────────── chunk 1 (24h) ────────────┼──────────── chunk 2 (24h) ────────────┤
//! start                              start+86400                              end
//!
//! gap: 50h
//! ├──────── chunk 1 (24h) ────────┼──────── chunk 2 (24h) ────────┼─ chunk 3 (2h) ─┤
//! ```
//!
//! Consecutive chunks share their boundary instant: the upstream treats
//! `start-timestamp` as exclusive, so `chunk[i].end == chunk[i + 1].start`
//! leaves neither overlap nor hole.

use crate::types::TimeRange;
use crate::MAX_CHUNK_SECS;

/// Splits `range` into consecutive chunks of at most `max_span` seconds.
///
/// A range no wider than `max_span` (zero-width included) is returned as a
/// single chunk. A non-positive `max_span` also yields the range unsplit.
pub fn plan_chunks(range: TimeRange, max_span: i64) -> Vec<TimeRange> {
    if max_span <= 0 || range.span() <= max_span {
        return vec![range];
    }

    let mut chunks = Vec::with_capacity((range.span() / max_span + 1) as usize);
    let mut cursor = range.start;

    while cursor < range.end {
        let end = cursor.saturating_add(max_span).min(range.end);
        chunks.push(TimeRange { start: cursor, end });
        cursor = end;
    }

    chunks
}

/// Splits `range` into day-sized chunks.
pub fn day_chunks(range: TimeRange) -> Vec<TimeRange> {
    plan_chunks(range, MAX_CHUNK_SECS)
}

// =============================================================================
// Unit Tests
// =============================================================================

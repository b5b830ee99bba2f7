//! # Fragment Merging
//!
//! Folds sensor fragments into one field map per timestamp.
//!
//! ## Merge Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Last Fragment Wins (per field)                       │
//! │                                                                         │
//! │  group 1 (ISS)      { ts: 100, x: 1 }                                   │
//! │  group 2 (barometer){ ts: 100, y: 2, x: 9 }                             │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  merged             { ts: 100, x: 9, y: 2 }                             │
//! │                                                                         │
//! │  • Fields shared with a later fragment are overwritten                 │
//! │  • Fields missing from a later fragment are kept                       │
//! │  • Timestamps keep the order they were first seen in                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::{FieldMap, SensorFragment, Timestamp};

/// Merged field maps keyed by timestamp, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRecords {
    order: Vec<Timestamp>,
    by_ts: HashMap<Timestamp, FieldMap>,
}

impl MergedRecords {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges fragments in the order given.
    pub fn merge<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = SensorFragment>,
    {
        let mut merged = Self::new();
        merged.extend(fragments);
        merged
    }

    /// Overlays one fragment onto the record for its timestamp.
    pub fn push(&mut self, fragment: SensorFragment) {
        match self.by_ts.get_mut(&fragment.ts) {
            Some(fields) => fields.extend(fragment.fields),
            None => {
                self.order.push(fragment.ts);
                self.by_ts.insert(fragment.ts, fragment.fields);
            }
        }
    }

    /// Number of distinct timestamps.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no fragment has been merged.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Fields merged for `ts`, if any.
    pub fn get(&self, ts: Timestamp) -> Option<&FieldMap> {
        self.by_ts.get(&ts)
    }

    /// Timestamps in first-seen order.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.order
    }

    /// Iterates `(ts, fields)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &FieldMap)> + '_ {
        self.order
            .iter()
            .filter_map(move |ts| self.by_ts.get(ts).map(|fields| (*ts, fields)))
    }

    /// Consumes the set into a `(ts, fields)` list in first-seen order.
    pub fn into_vec(mut self) -> Vec<(Timestamp, FieldMap)> {
        let by_ts = &mut self.by_ts;
        self.order
            .into_iter()
            .filter_map(|ts| by_ts.remove(&ts).map(|fields| (ts, fields)))
            .collect()
    }
}

impl Extend<SensorFragment> for MergedRecords {
    fn extend<T: IntoIterator<Item = SensorFragment>>(&mut self, iter: T) {
        for fragment in iter {
            self.push(fragment);
        }
    }
}

impl FromIterator<SensorFragment> for MergedRecords {
    fn from_iter<T: IntoIterator<Item = SensorFragment>>(iter: T) -> Self {
        Self::merge(iter)
    }
}

/// Reduces a "current" reading to the single record that gets published.
///
/// Takes the first merged record and, when a second exists, fills in the
/// fields the first lacks from it. The first record's values win on shared
/// fields and its timestamp is kept. Records past the second are ignored.
///
/// Fails with [`CoreError::EmptyReading`] when nothing was merged.
pub fn combine_latest(merged: MergedRecords) -> CoreResult<(Timestamp, FieldMap)> {
    let mut records = merged.into_vec().into_iter();

    let (ts, first) = records.next().ok_or(CoreError::EmptyReading)?;

    let fields = match records.next() {
        Some((_, mut second)) => {
            second.extend(first);
            second
        }
        None => first,
    };

    Ok((ts, fields))
}

// =============================================================================
// Unit Tests
// =============================================================================

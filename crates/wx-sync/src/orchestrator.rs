//! # Sync Orchestrator
//!
//! Makes a requested range complete in the local store, then reads it back.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    sync(station, [start, end])                          │
//! │                                                                         │
//! │  0. validate      start <= end, span <= 30 days      (no I/O yet)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. stored ts     [start - 450, end + 450]           wx-db             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. gaps          GapDetector (900s grid, ±450s)     wx-core           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. fetch         ChunkedFetcher per gap (≤ 1 day)   upstream          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. merge         MergedRecords (last fragment wins) wx-core           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. reconcile     INSERT OR IGNORE, one transaction  wx-db             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  6. read back     [start, end] ordered by ts         wx-db             │
//! │                                                                         │
//! │  A second run over the same range finds no gaps, adds 0 and returns    │
//! │  the same records.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{SyncError, SyncResult};
use crate::fetcher::ChunkedFetcher;
use crate::resolver::StationResolver;
use wx_core::gaps::GapDetector;
use wx_core::validation::validate_range;
use wx_core::{FieldMap, MergedRecords, StationId, TimeRange, WeatherRecord};
use wx_db::Database;

/// Result of one sync.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// Rows that were newly stored by this run.
    pub added: u64,

    /// Number of gaps that were fetched.
    pub gaps: usize,

    /// Every stored record in the requested range, ordered by ts.
    pub records: Vec<WeatherRecord>,
}

impl SyncOutcome {
    /// Field maps of the records, in order.
    pub fn into_fields(self) -> Vec<FieldMap> {
        self.records.into_iter().map(|r| r.fields).collect()
    }
}

/// Detects gaps, fills them from the upstream and serves the stored range.
#[derive(Clone)]
pub struct SyncOrchestrator {
    resolver: Arc<StationResolver>,
    fetcher: ChunkedFetcher,
    db: Database,
    detector: GapDetector,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(resolver: Arc<StationResolver>, fetcher: ChunkedFetcher, db: Database) -> Self {
        SyncOrchestrator {
            resolver,
            fetcher,
            db,
            detector: GapDetector::default(),
        }
    }

    /// Syncs `range` for the configured station.
    ///
    /// ## Errors
    /// - [`SyncError::InvalidRange`] before any I/O
    /// - [`SyncError::StationUnresolved`] when the station can't be identified
    pub async fn sync_current_station(&self, range: TimeRange) -> SyncResult<SyncOutcome> {
        validate_range(&range)?;

        let station = self.resolver.resolve().await.map_err(|e| {
            warn!(error = %e, "Station resolution failed");
            SyncError::StationUnresolved
        })?;

        self.sync(&station, range).await
    }

    /// Fills the gaps of `range` for `station` and returns the stored range.
    ///
    /// Failed upstream chunks are skipped; `added` counts only rows that were
    /// persisted. A store failure rolls back the whole reconciliation.
    #[instrument(skip(self), fields(station_id = %station, range = %range))]
    pub async fn sync(&self, station: &StationId, range: TimeRange) -> SyncResult<SyncOutcome> {
        validate_range(&range)?;

        let repo = self.db.weather();

        let stored = repo
            .timestamps_between(station, range.padded(self.detector.tolerance()))
            .await?;
        let gaps = self.detector.find_gaps(range, &stored);

        debug!(stored = stored.len(), gaps = gaps.len(), "Gap detection complete");

        let mut merged = MergedRecords::new();
        for gap in &gaps {
            merged.extend(self.fetcher.fetch(station, *gap).await);
        }

        let fresh: Vec<WeatherRecord> = merged
            .into_vec()
            .into_iter()
            .map(|(ts, fields)| WeatherRecord::new(ts, station.clone(), fields))
            .collect();

        let added = repo.insert_missing(&fresh).await?;
        let records = repo.records_between(station, range).await?;

        info!(
            gaps = gaps.len(),
            fetched = fresh.len(),
            added,
            returned = records.len(),
            "Sync complete"
        );

        Ok(SyncOutcome {
            added,
            gaps: gaps.len(),
            records,
        })
    }

    /// The resolver this orchestrator uses.
    pub fn resolver(&self) -> &Arc<StationResolver> {
        &self.resolver
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverSettings;
    use crate::testing::{FakeSource, STATION_ID, STATION_NAME};
    use serde_json::json;
    use wx_core::{ValidationError, MAX_CHUNK_SECS};
    use wx_db::DbConfig;

    async fn orchestrator(source: FakeSource) -> (SyncOrchestrator, Arc<FakeSource>, Database) {
        let source = Arc::new(source);
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let resolver = Arc::new(StationResolver::new(
            source.clone(),
            STATION_NAME,
            ResolverSettings::default(),
        ));
        let orchestrator =
            SyncOrchestrator::new(resolver, ChunkedFetcher::new(source.clone()), db.clone());
        (orchestrator, source, db)
    }

    fn station() -> StationId {
        StationId::new(STATION_ID)
    }

    #[tokio::test]
    async fn test_single_reading_in_empty_store() {
        let (orchestrator, _source, _db) = orchestrator(FakeSource::new().with_archive(vec![
            json!({"ts": 900, "temp": 71.0}),
            json!({"ts": 900, "bar": 29.9}),
        ]))
        .await;

        let range = TimeRange::new(0, 1800).unwrap();
        let outcome = orchestrator.sync(&station(), range).await.unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.gaps, 1);
        assert_eq!(outcome.records.len(), 1);

        let record = &outcome.records[0];
        assert_eq!(record.ts, 900);
        assert_eq!(record.fields["temp"], json!(71.0));
        assert_eq!(record.fields["bar"], json!(29.9));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let points = (0..=4).map(|i| json!({"ts": i * 900, "temp": i})).collect();
        let (orchestrator, source, _db) =
            orchestrator(FakeSource::new().with_archive(points)).await;

        let range = TimeRange::new(0, 3600).unwrap();
        let first = orchestrator.sync(&station(), range).await.unwrap();
        assert_eq!(first.added, 5);

        let calls_after_first = source.historic_calls().len();
        let second = orchestrator.sync(&station(), range).await.unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(second.gaps, 0);
        assert_eq!(second.records, first.records);
        assert_eq!(source.historic_calls().len(), calls_after_first);
    }

    #[tokio::test]
    async fn test_only_gaps_are_fetched() {
        let points = (0..=8).map(|i| json!({"ts": i * 900, "temp": i})).collect();
        let (orchestrator, source, db) =
            orchestrator(FakeSource::new().with_archive(points)).await;

        // Pre-store 0..=2700 (four grid points)
        let seeded: Vec<WeatherRecord> = (0..=3)
            .map(|i| {
                let fields = json!({"ts": i * 900}).as_object().cloned().unwrap();
                WeatherRecord::new(i * 900, station(), fields)
            })
            .collect();
        db.weather().insert_missing(&seeded).await.unwrap();

        let outcome = orchestrator
            .sync(&station(), TimeRange::new(0, 7200).unwrap())
            .await
            .unwrap();

        assert_eq!(source.historic_calls(), vec![TimeRange::new(3600, 7200).unwrap()]);
        assert_eq!(outcome.added, 5);
        assert_eq!(outcome.records.len(), 9);
    }

    #[tokio::test]
    async fn test_overlapping_concurrent_syncs_store_each_ts_once() {
        let points = (0..=6).map(|i| json!({"ts": i * 900, "temp": i})).collect();
        let (orchestrator, _source, db) =
            orchestrator(FakeSource::new().with_archive(points)).await;

        let station = station();
        let (a, b) = tokio::join!(
            orchestrator.sync(&station, TimeRange::new(0, 3600).unwrap()),
            orchestrator.sync(&station, TimeRange::new(1800, 5400).unwrap()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.added + b.added, 7);
        assert_eq!(db.weather().count().await.unwrap(), 7);

        let ts: Vec<i64> = a.records.iter().map(|r| r.ts).collect();
        assert_eq!(ts, vec![0, 900, 1800, 2700, 3600]);
        let ts: Vec<i64> = b.records.iter().map(|r| r.ts).collect();
        assert_eq!(ts, vec![1800, 2700, 3600, 4500, 5400]);
    }

    #[tokio::test]
    async fn test_failed_chunk_still_persists_the_rest() {
        let day = MAX_CHUNK_SECS;
        let (orchestrator, _source, db) = orchestrator(
            FakeSource::new()
                .with_archive(vec![json!({"ts": 900, "t": 1}), json!({"ts": day + 900, "t": 2})])
                .with_failing_chunk(0),
        )
        .await;

        let outcome = orchestrator
            .sync(&station(), TimeRange::new(0, 2 * day).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.records[0].ts, day + 900);
        assert_eq!(db.weather().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_range_limits_checked_before_io() {
        let (orchestrator, source, _db) = orchestrator(FakeSource::new()).await;

        let at_limit = TimeRange::new(0, 2_592_000).unwrap();
        assert!(orchestrator.sync(&station(), at_limit).await.is_ok());

        let calls = source.historic_calls().len();
        let over = TimeRange { start: 0, end: 2_592_001 };
        let err = orchestrator.sync_current_station(over).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::InvalidRange(ValidationError::RangeTooLarge { .. })
        ));
        assert_eq!(source.historic_calls().len(), calls);
    }

    #[tokio::test]
    async fn test_unresolved_station() {
        let (orchestrator, source, _db) =
            orchestrator(FakeSource::new().without_stations()).await;

        let err = orchestrator
            .sync_current_station(TimeRange::new(0, 900).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::StationUnresolved));
        assert!(source.historic_calls().is_empty());
    }

    #[tokio::test]
    async fn test_sync_current_station_resolves_then_syncs() {
        let (orchestrator, _source, _db) =
            orchestrator(FakeSource::new().with_archive(vec![json!({"ts": 900})])).await;

        let outcome = orchestrator
            .sync_current_station(TimeRange::new(0, 1800).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(orchestrator.resolver().cached(), Some(station()));
        assert_eq!(outcome.into_fields(), vec![json!({"ts": 900}).as_object().cloned().unwrap()]);
    }
}

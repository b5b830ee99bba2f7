//! # Current Snapshot
//!
//! The published "latest reading" and the job that refreshes it.
//!
//! ## Refresh Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SnapshotUpdater::refresh()                           │
//! │                                                                         │
//! │  already running? ──yes──► Skipped                                     │
//! │     │                                                                   │
//! │     no                                                                  │
//! │     ▼                                                                   │
//! │  resolve station ──► GET current/{id} ──► merge by ts                  │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                         first record, gaps filled from the second      │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                         SnapshotSlot::publish (whole Arc swap)         │
//! │                                                                         │
//! │  Any failure: log, keep the previous snapshot, report Failed.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info};

use crate::client::WeatherSource;
use crate::error::SyncResult;
use crate::resolver::StationResolver;
use crate::scheduler::RefreshTrigger;
use wx_core::merge::combine_latest;
use wx_core::{CurrentSnapshot, MergedRecords, Timestamp, WeatherRecord};

// =============================================================================
// Snapshot Slot
// =============================================================================

/// Shared holder of the latest [`CurrentSnapshot`].
///
/// Readers get an `Arc` to a complete snapshot; writers replace the `Arc`.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    current: RwLock<Option<Arc<CurrentSnapshot>>>,
}

impl SnapshotSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot, if one has been published.
    pub fn get(&self) -> Option<Arc<CurrentSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the published snapshot.
    pub fn publish(&self, snapshot: CurrentSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// Returns true until the first publish.
    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }
}

// =============================================================================
// Snapshot Updater
// =============================================================================

/// What a call to [`SnapshotUpdater::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot for `ts` was published.
    Published { ts: Timestamp },

    /// Another refresh was in progress.
    Skipped,

    /// The refresh failed; the previous snapshot is unchanged.
    Failed,
}

/// Fetches the latest reading and publishes it to a [`SnapshotSlot`].
pub struct SnapshotUpdater {
    resolver: Arc<StationResolver>,
    source: Arc<dyn WeatherSource>,
    slot: Arc<SnapshotSlot>,
    running: tokio::sync::Mutex<()>,
}

impl SnapshotUpdater {
    /// Creates an updater publishing into `slot`.
    pub fn new(
        resolver: Arc<StationResolver>,
        source: Arc<dyn WeatherSource>,
        slot: Arc<SnapshotSlot>,
    ) -> Self {
        SnapshotUpdater {
            resolver,
            source,
            slot,
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// The slot this updater publishes into.
    pub fn slot(&self) -> &Arc<SnapshotSlot> {
        &self.slot
    }

    /// Returns true while a refresh is in progress.
    pub fn is_refreshing(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Refreshes the snapshot. Never fails; see [`RefreshOutcome`].
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Snapshot refresh already running, skipping");
            return RefreshOutcome::Skipped;
        };

        match self.fetch_latest().await {
            Ok(snapshot) => {
                let ts = snapshot.record.ts;
                info!(
                    station_id = %snapshot.record.station_id,
                    ts,
                    fields = snapshot.record.fields.len(),
                    "Published current snapshot"
                );
                self.slot.publish(snapshot);
                RefreshOutcome::Published { ts }
            }
            Err(e) => {
                error!(error = %e, "Snapshot refresh failed, keeping previous snapshot");
                RefreshOutcome::Failed
            }
        }
    }

    async fn fetch_latest(&self) -> SyncResult<CurrentSnapshot> {
        let station = self.resolver.resolve().await?;
        let fragments = self.source.current(&station).await?;

        let (ts, fields) = combine_latest(MergedRecords::merge(fragments))?;

        Ok(CurrentSnapshot {
            record: WeatherRecord::new(ts, station, fields),
            refreshed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl RefreshTrigger for SnapshotUpdater {
    async fn trigger_refresh(&self) {
        self.refresh().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverSettings;
    use crate::error::SyncError;
    use crate::testing::{fragment, FakeSource, STATION_ID, STATION_NAME};
    use serde_json::json;
    use std::time::Duration;

    fn updater(source: FakeSource) -> (Arc<SnapshotUpdater>, Arc<FakeSource>) {
        let source = Arc::new(source);
        let resolver = Arc::new(StationResolver::new(
            source.clone(),
            STATION_NAME,
            ResolverSettings::default(),
        ));
        let updater = SnapshotUpdater::new(resolver, source.clone(), Arc::new(SnapshotSlot::new()));
        (Arc::new(updater), source)
    }

    #[tokio::test]
    async fn test_publishes_first_record_filled_from_second() {
        let (updater, _source) = updater(FakeSource::new().with_current(Ok(vec![
            fragment(json!({"ts": 600, "temp": 70})),
            fragment(json!({"ts": 300, "temp": 60, "rain": 0.1})),
            fragment(json!({"ts": 600, "hum": 40})),
        ])));

        assert!(updater.slot().is_empty());
        assert_eq!(updater.refresh().await, RefreshOutcome::Published { ts: 600 });

        let snapshot = updater.slot().get().unwrap();
        assert_eq!(snapshot.record.station_id.as_str(), STATION_ID);
        assert_eq!(snapshot.record.ts, 600);

        let fields = &snapshot.record.fields;
        assert_eq!(fields["temp"], json!(70));
        assert_eq!(fields["hum"], json!(40));
        assert_eq!(fields["rain"], json!(0.1));
        assert_eq!(fields["ts"], json!(600));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_snapshot() {
        let (updater, source) = updater(
            FakeSource::new().with_current(Ok(vec![fragment(json!({"ts": 900, "temp": 1}))])),
        );

        assert_eq!(updater.refresh().await, RefreshOutcome::Published { ts: 900 });
        let before = updater.slot().get().unwrap();

        source.push_current(Err(SyncError::RemoteStatus { status: 502 }));
        assert_eq!(updater.refresh().await, RefreshOutcome::Failed);

        source.push_current(Ok(vec![]));
        assert_eq!(updater.refresh().await, RefreshOutcome::Failed);

        let after = updater.slot().get().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_unresolved_station_publishes_nothing() {
        let (updater, _source) = updater(
            FakeSource::new()
                .without_stations()
                .with_current(Ok(vec![fragment(json!({"ts": 1}))])),
        );

        assert_eq!(updater.refresh().await, RefreshOutcome::Failed);
        assert!(updater.slot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_refresh_is_skipped() {
        let (updater, _source) = updater(
            FakeSource::new()
                .with_current(Ok(vec![fragment(json!({"ts": 5}))]))
                .with_current_delay(Duration::from_secs(10)),
        );

        let first = tokio::spawn({
            let updater = updater.clone();
            async move { updater.refresh().await }
        });

        while !updater.is_refreshing() {
            tokio::task::yield_now().await;
        }

        assert_eq!(updater.refresh().await, RefreshOutcome::Skipped);
        assert_eq!(first.await.unwrap(), RefreshOutcome::Published { ts: 5 });
        assert!(!updater.is_refreshing());
    }
}

//! Scripted [`WeatherSource`] shared by the unit tests of this crate.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::client::{StationSummary, WeatherSource};
use crate::error::{SyncError, SyncResult};
use wx_core::{FieldMap, SensorFragment, StationId, TimeRange, Timestamp};

pub(crate) const STATION_NAME: &str = "LeTourneau Civil Engineering Weather Station";
pub(crate) const STATION_ID: &str = "117994";

pub(crate) fn fields(value: Value) -> FieldMap {
    value.as_object().cloned().unwrap()
}

pub(crate) fn fragment(value: Value) -> SensorFragment {
    SensorFragment::from_data_point(fields(value)).unwrap()
}

/// In-memory upstream with scriptable failures.
#[derive(Default)]
pub(crate) struct FakeSource {
    directory: Vec<StationSummary>,
    directory_failures: AtomicU32,
    directory_delay: Option<Duration>,
    stations_calls: AtomicU32,

    archive: Vec<FieldMap>,
    failing_chunk_starts: Vec<Timestamp>,
    historic_calls: Mutex<Vec<TimeRange>>,

    current_replies: Mutex<VecDeque<SyncResult<Vec<SensorFragment>>>>,
    current_delay: Option<Duration>,
}

impl FakeSource {
    /// A source whose directory lists the tracked station.
    pub(crate) fn new() -> Self {
        FakeSource::default().with_station(STATION_NAME, STATION_ID)
    }

    pub(crate) fn with_station(mut self, name: &str, id: &str) -> Self {
        self.directory.push(StationSummary {
            station_name: name.to_string(),
            station_id: StationId::new(id),
        });
        self
    }

    pub(crate) fn without_stations(mut self) -> Self {
        self.directory.clear();
        self
    }

    /// The first `n` directory calls fail with a 503.
    pub(crate) fn with_directory_failures(self, n: u32) -> Self {
        self.directory_failures.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_directory_delay(mut self, delay: Duration) -> Self {
        self.directory_delay = Some(delay);
        self
    }

    /// Archived data points served by `historic`.
    pub(crate) fn with_archive(mut self, points: Vec<Value>) -> Self {
        self.archive = points.into_iter().map(fields).collect();
        self
    }

    /// A historic request starting at `start` fails.
    pub(crate) fn with_failing_chunk(mut self, start: Timestamp) -> Self {
        self.failing_chunk_starts.push(start);
        self
    }

    pub(crate) fn with_current(self, reply: SyncResult<Vec<SensorFragment>>) -> Self {
        self.push_current(reply);
        self
    }

    pub(crate) fn with_current_delay(mut self, delay: Duration) -> Self {
        self.current_delay = Some(delay);
        self
    }

    pub(crate) fn push_current(&self, reply: SyncResult<Vec<SensorFragment>>) {
        self.current_replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn stations_calls(&self) -> u32 {
        self.stations_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn historic_calls(&self) -> Vec<TimeRange> {
        self.historic_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherSource for FakeSource {
    async fn stations(&self) -> SyncResult<Vec<StationSummary>> {
        self.stations_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.directory_delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.directory_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.directory_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::RemoteStatus { status: 503 });
        }

        Ok(self.directory.clone())
    }

    async fn current(&self, _station: &StationId) -> SyncResult<Vec<SensorFragment>> {
        if let Some(delay) = self.current_delay {
            tokio::time::sleep(delay).await;
        }

        self.current_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(SyncError::RemoteTransport("no scripted reply".into())))
    }

    async fn historic(
        &self,
        _station: &StationId,
        range: TimeRange,
    ) -> SyncResult<Vec<SensorFragment>> {
        self.historic_calls.lock().unwrap().push(range);

        if self.failing_chunk_starts.contains(&range.start) {
            return Err(SyncError::RemoteStatus { status: 500 });
        }

        Ok(self
            .archive
            .iter()
            .cloned()
            .filter_map(SensorFragment::from_data_point)
            .filter(|f| range.contains(f.ts))
            .collect())
    }
}

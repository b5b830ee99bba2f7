//! # Chunked Fetcher
//!
//! Pulls a historic range from the upstream in requests of at most one day.
//! Chunks are requested one after another; a failed chunk is logged and
//! skipped so the rest of the range still lands.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::WeatherSource;
use wx_core::chunks::plan_chunks;
use wx_core::{SensorFragment, StationId, TimeRange, MAX_CHUNK_SECS};

/// Splits ranges into day-sized upstream requests.
#[derive(Clone)]
pub struct ChunkedFetcher {
    source: Arc<dyn WeatherSource>,
    max_chunk_secs: i64,
}

impl ChunkedFetcher {
    /// Creates a fetcher with the upstream's one-day request limit.
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        ChunkedFetcher {
            source,
            max_chunk_secs: MAX_CHUNK_SECS,
        }
    }

    /// Fetches every fragment of `range`, in chunk order.
    ///
    /// Best effort: chunks that fail contribute nothing.
    pub async fn fetch(&self, station: &StationId, range: TimeRange) -> Vec<SensorFragment> {
        let chunks = plan_chunks(range, self.max_chunk_secs);
        let total = chunks.len();
        let mut fragments = Vec::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            match self.source.historic(station, chunk).await {
                Ok(batch) => {
                    debug!(
                        station_id = %station,
                        chunk = %chunk,
                        index = index + 1,
                        total,
                        fragments = batch.len(),
                        "Fetched chunk"
                    );
                    fragments.extend(batch);
                }
                Err(e) => {
                    warn!(
                        station_id = %station,
                        chunk = %chunk,
                        index = index + 1,
                        total,
                        error = %e,
                        "Chunk fetch failed, skipping"
                    );
                }
            }
        }

        fragments
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Station Resolver
//!
//! Finds the upstream identifier of the configured station and caches it for
//! the life of the process.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Station Resolution                                   │
//! │                                                                         │
//! │  resolve()                                                             │
//! │     │                                                                   │
//! │     ├── cached? ───────────────────────────────────► StationId          │
//! │     │                                                                   │
//! │     ▼  (one caller runs the lookup, concurrent callers wait on it)     │
//! │  GET stations ──► name match? ──yes──────────────► cache + StationId   │
//! │     │                 │                                                 │
//! │     │                 no ─────────────────────────► StationNotFound    │
//! │     │                                                                   │
//! │   error                                                                 │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  attempt < max? ──yes──► sleep(1s, 2s, 4s, … 64s) ──► GET stations    │
//! │     │                                                                   │
//! │     no ──────────────────────────────────────────► StationUnavailable │
//! │                                                                         │
//! │  Callers that waited on a failed sequence get its error. A failed      │
//! │  resolution caches nothing; the next call starts a new sequence.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, instrument, warn};

use crate::client::WeatherSource;
use crate::config::ResolverSettings;
use crate::error::{SyncError, SyncResult};
use wx_core::StationId;

/// Upper bound on a single wait; far above the default schedule's 64s.
const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Memoizing, single-flight lookup of the tracked station's identifier.
pub struct StationResolver {
    source: Arc<dyn WeatherSource>,
    station_name: String,
    policy: ResolverSettings,
    station: OnceCell<StationId>,
    /// Held for the length of one retry sequence; keeps its failure.
    lookup: Mutex<Option<SyncError>>,
    /// Number of retry sequences that ended in failure.
    failures: AtomicU64,
}

impl StationResolver {
    /// Creates a resolver for `station_name`.
    pub fn new(
        source: Arc<dyn WeatherSource>,
        station_name: impl Into<String>,
        policy: ResolverSettings,
    ) -> Self {
        StationResolver {
            source,
            station_name: station_name.into(),
            policy,
            station: OnceCell::new(),
            lookup: Mutex::new(None),
            failures: AtomicU64::new(0),
        }
    }

    /// Display name being looked up.
    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    /// Identifier, if already resolved.
    pub fn cached(&self) -> Option<StationId> {
        self.station.get().cloned()
    }

    /// Returns the station identifier, resolving it on first use.
    ///
    /// ## Errors
    /// - [`SyncError::StationNotFound`] when the directory has no such name
    /// - [`SyncError::StationUnavailable`] once every attempt has failed
    pub async fn resolve(&self) -> SyncResult<StationId> {
        if let Some(id) = self.station.get() {
            return Ok(id.clone());
        }

        let seen = self.failures.load(Ordering::Acquire);
        let mut last_failure = self.lookup.lock().await;

        if let Some(id) = self.station.get() {
            return Ok(id.clone());
        }

        // A sequence failed while this caller was queued behind it
        if self.failures.load(Ordering::Acquire) != seen {
            if let Some(err) = last_failure.as_ref() {
                return Err(err.clone());
            }
        }

        match self.lookup_with_retry().await {
            Ok(id) => {
                let _ = self.station.set(id.clone());
                *last_failure = None;
                Ok(id)
            }
            Err(e) => {
                *last_failure = Some(e.clone());
                self.failures.fetch_add(1, Ordering::Release);
                Err(e)
            }
        }
    }

    #[instrument(skip(self), fields(station_name = %self.station_name))]
    async fn lookup_with_retry(&self) -> SyncResult<StationId> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.backoff();

        for attempt in 1..=max_attempts {
            match self.lookup_once().await {
                Ok(id) => {
                    info!(station_id = %id, attempt, "Station resolved");
                    return Ok(id);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt == max_attempts {
                        warn!(error = %e, attempt, "Station lookup failed, giving up");
                        break;
                    }

                    let delay = backoff.next_backoff().unwrap_or(MAX_BACKOFF);
                    warn!(
                        error = %e,
                        attempt,
                        retry_in_secs = delay.as_secs_f64(),
                        "Station lookup failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(SyncError::StationUnavailable {
            attempts: max_attempts,
        })
    }

    async fn lookup_once(&self) -> SyncResult<StationId> {
        self.source
            .stations()
            .await?
            .into_iter()
            .find(|s| s.station_name == self.station_name)
            .map(|s| s.station_id)
            .ok_or_else(|| SyncError::StationNotFound(self.station_name.clone()))
    }

    /// Deterministic schedule: `initial * factor^(n-1)` with no jitter.
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_secs(self.policy.initial_delay_secs))
            .with_multiplier(self.policy.backoff_factor)
            .with_randomization_factor(0.0)
            .with_max_interval(MAX_BACKOFF)
            .with_max_elapsed_time(None)
            .build()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

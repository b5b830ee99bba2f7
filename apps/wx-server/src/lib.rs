//! # wx-server
//!
//! HTTP front end for the weather station sync engine.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           HTTP Routes                                   │
//! │                                                                         │
//! │  GET /current          ──► SnapshotSlot::get          (no upstream I/O) │
//! │                            200 {"data":[fields]} | 503                  │
//! │                                                                         │
//! │  GET /historic         ──► SyncOrchestrator::sync_current_station       │
//! │      ?start-timestamp      gaps filled, then the stored range is read   │
//! │      &end-timestamp        200 {"message","addedCount","data"} | 400    │
//! │                                                                         │
//! │  GET /clear_database   ──► WeatherRecordRepository::clear_all           │
//! │                                                                         │
//! │  GET /health           ──► database, latest stored ts, snapshot         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot is refreshed by a `RefreshScheduler` spawned in `main`, so
//! `/current` only ever reads what was last published.

pub mod error;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use wx_core::{TimeRange, Timestamp, DEFAULT_HISTORIC_WINDOW_SECS};
use wx_db::Database;
use wx_sync::{
    ChunkedFetcher, SnapshotSlot, SnapshotUpdater, StationResolver, SyncOrchestrator,
    WeatherSource, WxConfig,
};

pub use error::{ApiError, ApiResult};

/// Query parameter holding the range start (epoch seconds).
pub const START_PARAM: &str = "start-timestamp";

/// Query parameter holding the range end (epoch seconds).
pub const END_PARAM: &str = "end-timestamp";

const NON_INTEGER_PARAMS: &str = "start-timestamp and end-timestamp must be integers";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub orchestrator: SyncOrchestrator,
    pub updater: Arc<SnapshotUpdater>,
}

impl AppState {
    /// Wires the sync engine around `source` and `db`.
    ///
    /// The resolver is shared, so whichever of `/historic` or the snapshot
    /// refresh resolves the station first caches it for the other.
    pub fn new(db: Database, source: Arc<dyn WeatherSource>, config: &WxConfig) -> Self {
        let resolver = Arc::new(StationResolver::new(
            source.clone(),
            config.api.station_name.clone(),
            config.resolver.clone(),
        ));

        let orchestrator = SyncOrchestrator::new(
            resolver.clone(),
            ChunkedFetcher::new(source.clone()),
            db.clone(),
        );

        let updater = Arc::new(SnapshotUpdater::new(
            resolver,
            source,
            Arc::new(SnapshotSlot::new()),
        ));

        AppState {
            db,
            orchestrator,
            updater,
        }
    }

    /// The slot `/current` reads from.
    pub fn slot(&self) -> &Arc<SnapshotSlot> {
        self.updater.slot()
    }
}

/// Builds the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/current", get(current_handler))
        .route("/historic", get(historic_handler))
        .route("/clear_database", get(clear_database_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Latest published reading.
async fn current_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let snapshot = state.slot().get().ok_or(ApiError::NotAvailable)?;
    Ok(Json(json!({ "data": [&snapshot.record.fields] })))
}

/// Gap-fills the requested range, then returns every stored record in it.
async fn historic_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let range = requested_range(&params, Utc::now().timestamp())?;
    let outcome = state.orchestrator.sync_current_station(range).await?;

    let added = outcome.added;
    Ok(Json(json!({
        "message": format!("Successfully retrieved WeatherLink API data. Added {added} new entries."),
        "addedCount": added,
        "data": outcome.into_fields(),
    })))
}

async fn clear_database_handler(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let deleted = state
        .db
        .weather()
        .clear_all()
        .await
        .map_err(|e| ApiError::BadRequest(format!("An error occurred: {e}")))?;

    info!(deleted, "Cleared weather records");

    Ok(Json(json!({
        "message": format!("Successfully deleted {deleted} rows"),
        "deleted": deleted,
    })))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = state.db.health_check().await;
    let (total, applied) = state.db.migration_status().await.unwrap_or((0, 0));
    let snapshot = state.slot().get().map(|s| {
        json!({
            "ts": s.record.ts,
            "refreshed_at": s.refreshed_at,
        })
    });

    let station = state.orchestrator.resolver().cached();
    let latest_ts = match &station {
        Some(id) => match state.db.weather().latest(id).await {
            Ok(record) => record.map(|r| r.ts),
            Err(e) => {
                warn!(error = %e, "Failed to read latest stored record");
                None
            }
        },
        None => None,
    };

    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "database": database,
        "migrations": { "applied": applied, "total": total },
        "station_id": station,
        "latest_stored_ts": latest_ts,
        "snapshot": snapshot,
        "refreshing": state.updater.is_refreshing(),
    }))
}

/// Reads the range from query parameters.
///
/// Missing bounds default to the last seven days ending at `now`. Span
/// limits are left to the orchestrator.
pub fn requested_range(params: &HashMap<String, String>, now: Timestamp) -> ApiResult<TimeRange> {
    let bound = |key: &str, default: Timestamp| -> ApiResult<Timestamp> {
        match params.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ApiError::BadRequest(NON_INTEGER_PARAMS.to_string())),
        }
    };

    let end = bound(END_PARAM, now)?;
    let start = bound(START_PARAM, now - DEFAULT_HISTORIC_WINDOW_SECS)?;

    Ok(TimeRange::new(start, end)?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wx_core::{SensorFragment, StationId};
    use wx_db::DbConfig;
    use wx_sync::{RefreshOutcome, StationSummary, SyncResult};

    const STATION: &str = "Campus Weather Station";

    /// Upstream with a fixed directory, reading and archive.
    #[derive(Default)]
    struct StubSource {
        listed: bool,
        current: Vec<Value>,
        archive: Vec<Value>,
    }

    fn fragments(points: &[Value]) -> Vec<SensorFragment> {
        points
            .iter()
            .filter_map(|p| p.as_object().cloned())
            .filter_map(SensorFragment::from_data_point)
            .collect()
    }

    #[async_trait]
    impl WeatherSource for StubSource {
        async fn stations(&self) -> SyncResult<Vec<StationSummary>> {
            if !self.listed {
                return Ok(Vec::new());
            }
            Ok(vec![StationSummary {
                station_name: STATION.to_string(),
                station_id: StationId::new("42"),
            }])
        }

        async fn current(&self, _station: &StationId) -> SyncResult<Vec<SensorFragment>> {
            Ok(fragments(&self.current))
        }

        async fn historic(
            &self,
            _station: &StationId,
            range: TimeRange,
        ) -> SyncResult<Vec<SensorFragment>> {
            Ok(fragments(&self.archive)
                .into_iter()
                .filter(|f| range.contains(f.ts))
                .collect())
        }
    }

    async fn app(source: StubSource) -> (Router, Arc<AppState>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = WxConfig::default();
        config.api.station_name = STATION.to_string();

        let state = Arc::new(AppState::new(db, Arc::new(source), &config));
        (router(state.clone()), state)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_current_before_first_refresh_is_unavailable() {
        let (app, _state) = app(StubSource::default()).await;

        let (status, body) = get_json(&app, "/current").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"error": "Weather data not available"}));
    }

    #[tokio::test]
    async fn test_current_serves_published_snapshot() {
        let (app, state) = app(StubSource {
            listed: true,
            current: vec![json!({"ts": 600, "temp": 70}), json!({"ts": 600, "hum": 40})],
            ..Default::default()
        })
        .await;

        assert_eq!(state.updater.refresh().await, RefreshOutcome::Published { ts: 600 });

        let (status, body) = get_json(&app, "/current").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["temp"], json!(70));
        assert_eq!(body["data"][0]["hum"], json!(40));
    }

    #[tokio::test]
    async fn test_historic_fills_gap_and_returns_range() {
        let (app, state) = app(StubSource {
            listed: true,
            archive: vec![json!({"ts": 900, "temp": 71.0}), json!({"ts": 900, "bar": 29.9})],
            ..Default::default()
        })
        .await;

        let (status, body) = get_json(&app, "/historic?start-timestamp=0&end-timestamp=1800").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["addedCount"], json!(1));
        assert_eq!(
            body["message"],
            json!("Successfully retrieved WeatherLink API data. Added 1 new entries.")
        );
        assert_eq!(body["data"], json!([{"ts": 900, "temp": 71.0, "bar": 29.9}]));

        // Second request adds nothing and returns the same data
        let (_, again) = get_json(&app, "/historic?start-timestamp=0&end-timestamp=1800").await;
        assert_eq!(again["addedCount"], json!(0));
        assert_eq!(again["data"], body["data"]);
        assert_eq!(state.db.weather().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_historic_rejects_non_integer_params() {
        let (app, _state) = app(StubSource::default()).await;

        let (status, body) = get_json(&app, "/historic?start-timestamp=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!(NON_INTEGER_PARAMS));
    }

    #[tokio::test]
    async fn test_historic_rejects_ranges_over_thirty_days() {
        let (app, state) = app(StubSource {
            listed: true,
            ..Default::default()
        })
        .await;

        let (status, body) =
            get_json(&app, "/historic?start-timestamp=0&end-timestamp=2592001").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            json!("Error: Time range exceeds 30 days. Please request a shorter range.")
        );
        assert!(state.orchestrator.resolver().cached().is_none());

        let (status, _) = get_json(
            &app,
            "/historic?start-timestamp=-9223372036854775808&end-timestamp=9223372036854775807",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_historic_without_station_is_bad_request() {
        let (app, _state) = app(StubSource::default()).await;

        let (status, body) = get_json(&app, "/historic?start-timestamp=0&end-timestamp=900").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Station ID not found"));
    }

    #[tokio::test]
    async fn test_clear_database_reports_deleted_rows() {
        let (app, _state) = app(StubSource {
            listed: true,
            archive: vec![json!({"ts": 0}), json!({"ts": 900})],
            ..Default::default()
        })
        .await;

        get_json(&app, "/historic?start-timestamp=0&end-timestamp=900").await;

        let (status, body) = get_json(&app, "/clear_database").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Successfully deleted 2 rows", "deleted": 2}));
    }

    #[tokio::test]
    async fn test_health_reports_store_and_snapshot() {
        let (app, _state) = app(StubSource::default()).await;

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["database"], json!(true));
        assert_eq!(body["migrations"]["applied"], body["migrations"]["total"]);
        assert!(body["snapshot"].is_null());
        assert!(body["station_id"].is_null());
        assert!(body["latest_stored_ts"].is_null());
    }

    #[tokio::test]
    async fn test_health_reports_latest_stored_reading() {
        let (app, _state) = app(StubSource {
            listed: true,
            archive: vec![json!({"ts": 0}), json!({"ts": 900})],
            ..Default::default()
        })
        .await;

        get_json(&app, "/historic?start-timestamp=0&end-timestamp=900").await;

        let (_, body) = get_json(&app, "/health").await;
        assert_eq!(body["station_id"], json!("42"));
        assert_eq!(body["latest_stored_ts"], json!(900));
    }

    #[test]
    fn test_requested_range_defaults_to_last_week() {
        let now = 10_000_000;
        let range = requested_range(&HashMap::new(), now).unwrap();
        assert_eq!(range, TimeRange::new(now - 7 * 86_400, now).unwrap());

        let params = HashMap::from([(START_PARAM.to_string(), "9000000".to_string())]);
        assert_eq!(
            requested_range(&params, now).unwrap(),
            TimeRange::new(9_000_000, now).unwrap()
        );
    }

    #[test]
    fn test_requested_range_rejects_reversed_bounds() {
        let params = HashMap::from([
            (START_PARAM.to_string(), "200".to_string()),
            (END_PARAM.to_string(), "100".to_string()),
        ]);
        let err = requested_range(&params, 0).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

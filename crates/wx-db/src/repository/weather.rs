//! # Weather Record Repository
//!
//! Storage of merged readings, keyed by `(station_id, ts)`.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Insert-If-Absent Reconciliation                      │
//! │                                                                         │
//! │  merged records from the upstream                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  for each record:                                              │   │
//! │  │    INSERT OR IGNORE INTO weather_records                       │   │
//! │  │      (station_id, ts, sensor_data) VALUES (?, ?, ?)            │   │
//! │  │    inserted += rows_affected   (0 if the key already existed)  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← all rows land or none do                                     │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • A stored row is never overwritten                                   │
//! │  • Concurrent syncs of overlapping ranges cannot duplicate a key       │
//! │  • A dropped future rolls the transaction back                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use wx_core::{FieldMap, StationId, TimeRange, Timestamp, WeatherRecord};

/// Raw row as stored.
#[derive(Debug, FromRow)]
struct WeatherRow {
    station_id: String,
    ts: i64,
    sensor_data: String,
}

impl WeatherRow {
    fn into_record(self) -> DbResult<WeatherRecord> {
        let fields: FieldMap = serde_json::from_str(&self.sensor_data)
            .map_err(|e| DbError::corrupt(&self.station_id, self.ts, e))?;

        Ok(WeatherRecord::new(self.ts, StationId::new(self.station_id), fields))
    }
}

/// Repository for weather record operations.
#[derive(Debug, Clone)]
pub struct WeatherRecordRepository {
    pool: SqlitePool,
}

impl WeatherRecordRepository {
    /// Creates a new WeatherRecordRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WeatherRecordRepository { pool }
    }

    /// Stored timestamps for `station` inside `range` (bounds inclusive), ascending.
    pub async fn timestamps_between(
        &self,
        station: &StationId,
        range: TimeRange,
    ) -> DbResult<Vec<Timestamp>> {
        let timestamps: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT ts FROM weather_records
            WHERE station_id = ?1 AND ts BETWEEN ?2 AND ?3
            ORDER BY ts ASC
            "#,
        )
        .bind(station.as_str())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(timestamps)
    }

    /// Inserts every record whose `(station_id, ts)` is not yet stored.
    ///
    /// Runs in one transaction; existing rows are left untouched.
    ///
    /// ## Returns
    /// Number of rows actually inserted.
    pub async fn insert_missing(&self, records: &[WeatherRecord]) -> DbResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut inserted = 0u64;

        for record in records {
            let sensor_data = serde_json::to_string(&record.fields)
                .map_err(|e| DbError::corrupt(record.station_id.as_str(), record.ts, e))?;

            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO weather_records (station_id, ts, sensor_data)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(record.station_id.as_str())
            .bind(record.ts)
            .bind(sensor_data)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            offered = records.len(),
            inserted = inserted,
            "Reconciled weather records"
        );

        Ok(inserted)
    }

    /// Stored records for `station` inside `range` (bounds inclusive), ordered by ts.
    pub async fn records_between(
        &self,
        station: &StationId,
        range: TimeRange,
    ) -> DbResult<Vec<WeatherRecord>> {
        let rows: Vec<WeatherRow> = sqlx::query_as(
            r#"
            SELECT station_id, ts, sensor_data FROM weather_records
            WHERE station_id = ?1 AND ts BETWEEN ?2 AND ?3
            ORDER BY ts ASC
            "#,
        )
        .bind(station.as_str())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WeatherRow::into_record).collect()
    }

    /// Most recent stored record for `station`.
    pub async fn latest(&self, station: &StationId) -> DbResult<Option<WeatherRecord>> {
        let row: Option<WeatherRow> = sqlx::query_as(
            r#"
            SELECT station_id, ts, sensor_data FROM weather_records
            WHERE station_id = ?1
            ORDER BY ts DESC
            LIMIT 1
            "#,
        )
        .bind(station.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(WeatherRow::into_record).transpose()
    }

    /// Total number of stored rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM weather_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes every stored row.
    ///
    /// ## Returns
    /// Number of deleted rows.
    pub async fn clear_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM weather_records")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Weather Store Connection
//!
//! Opens the SQLite file that holds `weather_records` and hands out
//! repositories over it.
//!
//! ## Access Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Who Touches the Store                              │
//! │                                                                         │
//! │  /historic ──► timestamps_between ──► insert_missing (one tx) ──►      │
//! │                records_between                                          │
//! │                                                                         │
//! │  /clear_database ──► clear_all                                         │
//! │  /health         ──► SELECT 1, migration status, latest                │
//! │                                                                         │
//! │  Two /historic requests may reconcile at once. The primary key on      │
//! │  (station_id, ts) plus INSERT OR IGNORE keeps one row per reading;     │
//! │  busy_timeout makes the second writer wait instead of failing.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::weather::WeatherRecordRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the store lives and how many connections may use it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub path: PathBuf,

    pub max_connections: u32,

    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,

    /// How long a writer waits on a lock held by another writer.
    pub busy_timeout: Duration,

    /// Apply pending migrations when the pool opens.
    pub migrate_on_connect: bool,
}

impl DbConfig {
    /// File-backed store at `path`; the file is created when missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            migrate_on_connect: true,
        }
    }

    /// Private in-memory store, used by tests.
    ///
    /// Every connection to `:memory:` would see its own empty database, so the
    /// pool is held to one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn migrate_on_connect(mut self, migrate: bool) -> Self {
        self.migrate_on_connect = migrate;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        Ok(options.busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the weather store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.path.display(), "Opening weather store");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };

        if config.migrate_on_connect {
            db.run_migrations().await?;
        }

        info!(max_connections = config.max_connections, "Weather store ready");
        Ok(db)
    }

    /// Applies pending migrations; already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Repository over `weather_records`.
    pub fn weather(&self) -> WeatherRecordRepository {
        WeatherRecordRepository::new(self.pool.clone())
    }

    /// Closes the pool; later queries fail.
    pub async fn close(&self) {
        info!("Closing weather store");
        self.pool.close().await;
    }

    /// True if a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_is_healthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_migrations_applied_on_connect() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (total, applied) = db.migration_status().await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(applied, 1);

        // Running again is a no-op
        db.run_migrations().await.unwrap();
        assert_eq!(db.weather().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_without_migrations_has_no_table() {
        let db = Database::new(DbConfig::in_memory().migrate_on_connect(false))
            .await
            .unwrap();

        assert!(db.health_check().await);
        assert!(db.weather().count().await.is_err());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("weather_data.db")
            .max_connections(10)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
        assert_eq!(DbConfig::in_memory().max_connections, 1);
    }
}

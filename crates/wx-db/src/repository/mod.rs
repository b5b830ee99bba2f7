//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  SyncOrchestrator / HTTP handler                                       │
//! │       │                                                                 │
//! │       │  db.weather().timestamps_between(&station, range)              │
//! │       ▼                                                                 │
//! │  WeatherRecordRepository                                               │
//! │  ├── timestamps_between(&self, station, range)                         │
//! │  ├── insert_missing(&self, records)                                    │
//! │  ├── records_between(&self, station, range)                            │
//! │  └── clear_all(&self)                                                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`weather::WeatherRecordRepository`] - Merged weather readings

pub mod weather;

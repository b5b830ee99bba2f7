//! # Service Configuration
//!
//! Configuration for the upstream client, resolver, snapshot refresh, store
//! and HTTP listener.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     API_KEY / API_SECRET                                               │
//! │     WX_API_URL, WX_STATION_NAME, WX_DATABASE_PATH, WX_PORT, ...        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/wx-sync/wx-sync.toml (Linux)                             │
//! │     ~/Library/Application Support/org.wx.wx-sync/wx-sync.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://api.weatherlink.com/v2/"
//! api_key = "..."
//! api_secret = "..."
//! station_name = "LeTourneau Civil Engineering Weather Station"
//!
//! [resolver]
//! max_attempts = 8
//! initial_delay_secs = 1
//! backoff_factor = 2.0
//!
//! [snapshot]
//! refresh_interval_secs = 300
//!
//! [database]
//! path = "weather_data.db"
//!
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use wx_core::validation::{validate_positive, validate_station_name};

// =============================================================================
// Upstream API Settings
// =============================================================================

/// Upstream WeatherLink v2 API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL; endpoint paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as the `api-key` query parameter.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Sent as the `x-api-secret` header.
    #[serde(default = "default_api_secret")]
    pub api_secret: String,

    /// Display name the resolver looks for in the station directory.
    #[serde(default = "default_station_name")]
    pub station_name: String,

    /// TCP connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.weatherlink.com/v2/".to_string()
}

fn default_api_key() -> String {
    "default_key".to_string()
}

fn default_api_secret() -> String {
    "default_secret".to_string()
}

fn default_station_name() -> String {
    "LeTourneau Civil Engineering Weather Station".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            api_key: default_api_key(),
            api_secret: default_api_secret(),
            station_name: default_station_name(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiSettings {
    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Resolver Settings
// =============================================================================

/// Retry policy for station resolution.
///
/// ## Schedule (defaults)
/// ```text
/// attempt:  1    2    3    4    5    6    7    8
/// wait:       1s   2s   4s   8s  16s  32s  64s     → StationUnavailable
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Total attempts, the first included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait after the first failed attempt (seconds).
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// Multiplier applied to the wait after each failure.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_attempts() -> u32 {
    8
}

fn default_initial_delay() -> u64 {
    1
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for ResolverSettings {
    fn default() -> Self {
        ResolverSettings {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

// =============================================================================
// Snapshot Settings
// =============================================================================

/// Current-reading refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Seconds between refreshes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    300
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        SnapshotSettings {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl SnapshotSettings {
    /// Refresh interval as a Duration.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Local store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("weather_data.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Server Settings
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WxConfig {
    /// Upstream API settings.
    #[serde(default)]
    pub api: ApiSettings,

    /// Station resolution retry policy.
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Snapshot refresh settings.
    #[serde(default)]
    pub snapshot: SnapshotSettings,

    /// Local store settings.
    #[serde(default)]
    pub database: DatabaseSettings,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,
}

impl WxConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (wx-sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());

        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        validate_station_name(&self.api.station_name)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        for (field, value) in [
            ("resolver.max_attempts", u64::from(self.resolver.max_attempts)),
            ("snapshot.refresh_interval_secs", self.snapshot.refresh_interval_secs),
            ("database.max_connections", u64::from(self.database.max_connections)),
            ("api.request_timeout_secs", self.api.request_timeout_secs),
        ] {
            validate_positive(field, value).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        }

        let factor = self.resolver.backoff_factor;
        if factor.is_nan() || factor < 1.0 {
            return Err(SyncError::InvalidConfig(
                "resolver.backoff_factor must be at least 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in `load`).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("API_KEY") {
            self.api.api_key = key;
        }

        if let Some(secret) = lookup("API_SECRET") {
            self.api.api_secret = secret;
        }

        if let Some(url) = lookup("WX_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(name) = lookup("WX_STATION_NAME") {
            debug!(station_name = %name, "Overriding station name from environment");
            self.api.station_name = name;
        }

        if let Some(path) = lookup("WX_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(port) = lookup("WX_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid WX_PORT"),
            }
        }

        if let Some(secs) = lookup("WX_REFRESH_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.snapshot.refresh_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid WX_REFRESH_INTERVAL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "wx", "wx-sync")
            .map(|dirs| dirs.config_dir().join("wx-sync.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = WxConfig::default();
        assert_eq!(config.resolver.max_attempts, 8);
        assert_eq!(config.resolver.initial_delay_secs, 1);
        assert_eq!(config.snapshot.refresh_interval_secs, 300);
        assert_eq!(config.server.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.database.path, PathBuf::from("weather_data.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = WxConfig::default();

        config.api.base_url = "ftp://example.com/".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.api.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.api.base_url = "http://localhost:8080/v2/".into();
        assert!(config.validate().is_ok());

        config.api.station_name = "  ".into();
        assert!(config.validate().unwrap_err().is_config_error());

        config.api.station_name = "Station".into();
        config.snapshot.refresh_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("API_KEY", "k"),
            ("API_SECRET", "s"),
            ("WX_PORT", "8081"),
            ("WX_REFRESH_INTERVAL_SECS", "not-a-number"),
            ("WX_DATABASE_PATH", "/var/lib/wx/weather.db"),
        ]
        .into_iter()
        .collect();

        let mut config = WxConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.api_key, "k");
        assert_eq!(config.api.api_secret, "s");
        assert_eq!(config.server.port, 8081);
        // Unparseable values are ignored
        assert_eq!(config.snapshot.refresh_interval_secs, 300);
        assert_eq!(config.database.path, PathBuf::from("/var/lib/wx/weather.db"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: WxConfig = toml::from_str(
            r#"
            [api]
            station_name = "Rooftop"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.api.station_name, "Rooftop");
        assert_eq!(config.api.base_url, "https://api.weatherlink.com/v2/");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.resolver.backoff_factor, 2.0);
    }

    #[test]
    fn test_load_reads_toml_file() {
        let path = std::env::temp_dir().join(format!("wx-sync-test-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[snapshot]\nrefresh_interval_secs = 60\n\n[database]\npath = \"rooftop.db\"\n",
        )
        .unwrap();

        let loaded = WxConfig::load(Some(path.clone()));
        let _ = std::fs::remove_file(&path);

        let config = loaded.unwrap();
        assert_eq!(config.resolver.max_attempts, 8);
        assert!(config.api.base_url.starts_with("http"));
        if std::env::var("WX_REFRESH_INTERVAL_SECS").is_err() {
            assert_eq!(config.snapshot.refresh_interval_secs, 60);
        }
        if std::env::var("WX_DATABASE_PATH").is_err() {
            assert_eq!(config.database.path, PathBuf::from("rooftop.db"));
        }
    }
}

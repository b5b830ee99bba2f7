//! # Upstream Weather Client
//!
//! The [`WeatherSource`] seam and its WeatherLink v2 HTTP implementation.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    WeatherLink v2 Calls                                 │
//! │                                                                         │
//! │  every call:  ?api-key=<key>            header  x-api-secret: <secret> │
//! │                                                                         │
//! │  GET {base}stations                                                    │
//! │      → {"stations":[{"station_name":"…","station_id":117994}]}         │
//! │                                                                         │
//! │  GET {base}current/{id}                                                │
//! │      → {"sensors":[{"data":[{"ts":…, "temp":…}]}, …]}                  │
//! │                                                                         │
//! │  GET {base}historic/{id}?start-timestamp=S&end-timestamp=E             │
//! │      → same shape as current                                           │
//! │                                                                         │
//! │  Each sensor group contributes its data points in order; a point       │
//! │  becomes one SensorFragment.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ApiSettings;
use crate::error::{SyncError, SyncResult};
use wx_core::{SensorFragment, StationId, TimeRange};

// =============================================================================
// Source Trait
// =============================================================================

/// Read access to the upstream weather API.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Station directory visible to the configured credentials.
    async fn stations(&self) -> SyncResult<Vec<StationSummary>>;

    /// Latest reading of `station`, one fragment per sensor data point.
    async fn current(&self, station: &StationId) -> SyncResult<Vec<SensorFragment>>;

    /// Archived readings of `station` over `range`.
    ///
    /// `range` should span at most one day; see [`crate::fetcher`].
    async fn historic(
        &self,
        station: &StationId,
        range: TimeRange,
    ) -> SyncResult<Vec<SensorFragment>>;
}

// =============================================================================
// Response Shapes
// =============================================================================

/// One entry of the station directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StationSummary {
    pub station_name: String,
    #[serde(deserialize_with = "station_id_from_number_or_string")]
    pub station_id: StationId,
}

/// Body of `GET stations`.
#[derive(Debug, Deserialize)]
pub struct StationsResponse {
    #[serde(default)]
    pub stations: Vec<StationSummary>,
}

/// Body of `GET current/{id}` and `GET historic/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct SensorsResponse {
    #[serde(default)]
    pub sensors: Vec<SensorGroup>,
}

/// Readings reported by one sensor group.
#[derive(Debug, Default, Deserialize)]
pub struct SensorGroup {
    #[serde(default)]
    pub data: Vec<Value>,
}

impl SensorsResponse {
    /// Flattens groups into fragments, preserving group then point order.
    ///
    /// Points that are not objects or have no integer `ts` are dropped.
    pub fn into_fragments(self) -> Vec<SensorFragment> {
        let mut dropped = 0usize;
        let fragments: Vec<SensorFragment> = self
            .sensors
            .into_iter()
            .flat_map(|group| group.data)
            .filter_map(|point| {
                let fragment = match point {
                    Value::Object(fields) => SensorFragment::from_data_point(fields),
                    _ => None,
                };
                if fragment.is_none() {
                    dropped += 1;
                }
                fragment
            })
            .collect();

        if dropped > 0 {
            debug!(dropped, "Dropped data points without a usable ts");
        }

        fragments
    }
}

/// Accepts `"station_id": 117994` as well as `"station_id": "117994"`.
fn station_id_from_number_or_string<'de, D>(deserializer: D) -> Result<StationId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => StationId::new(n.to_string()),
        RawId::Text(s) => StationId::new(s),
    })
}

// =============================================================================
// WeatherLink Client
// =============================================================================

/// reqwest-backed [`WeatherSource`] for the WeatherLink v2 API.
#[derive(Debug, Clone)]
pub struct WeatherLinkClient {
    http: Client,
    base_url: Url,
    api_key: String,
    api_secret: String,
}

impl WeatherLinkClient {
    /// Builds a client with the configured timeouts and credentials.
    pub fn new(settings: &ApiSettings) -> SyncResult<Self> {
        let mut base_url = Url::parse(&settings.base_url)?;

        // Url::join replaces the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(WeatherLinkClient {
            http,
            base_url,
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
        })
    }

    /// Resolves an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> SyncResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T, Q>(&self, url: Url, query: &Q) -> SyncResult<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let response = self
            .http
            .get(url)
            .query(&[("api-key", self.api_key.as_str())])
            .query(query)
            .header("x-api-secret", &self.api_secret)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl WeatherSource for WeatherLinkClient {
    #[instrument(skip(self))]
    async fn stations(&self) -> SyncResult<Vec<StationSummary>> {
        let url = self.endpoint("stations")?;
        let body: StationsResponse = self.get_json(url, &[] as &[(&str, &str)]).await?;
        debug!(count = body.stations.len(), "Fetched station directory");
        Ok(body.stations)
    }

    #[instrument(skip(self), fields(station_id = %station))]
    async fn current(&self, station: &StationId) -> SyncResult<Vec<SensorFragment>> {
        let url = self.endpoint(&format!("current/{}", station))?;
        let body: SensorsResponse = self.get_json(url, &[] as &[(&str, &str)]).await?;
        Ok(body.into_fragments())
    }

    #[instrument(skip(self), fields(station_id = %station, range = %range))]
    async fn historic(
        &self,
        station: &StationId,
        range: TimeRange,
    ) -> SyncResult<Vec<SensorFragment>> {
        let url = self.endpoint(&format!("historic/{}", station))?;
        let query = [("start-timestamp", range.start), ("end-timestamp", range.end)];
        let body: SensorsResponse = self.get_json(url, &query).await?;
        Ok(body.into_fragments())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_station_id_accepts_number_or_string() {
        let body: StationsResponse = serde_json::from_value(json!({
            "stations": [
                {"station_name": "Numeric", "station_id": 117994},
                {"station_name": "Text", "station_id": "abc-1"}
            ]
        }))
        .unwrap();

        assert_eq!(body.stations[0].station_id, StationId::new("117994"));
        assert_eq!(body.stations[1].station_id, StationId::new("abc-1"));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let body: StationsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.stations.is_empty());

        let body: SensorsResponse = serde_json::from_value(json!({"sensors": [{}]})).unwrap();
        assert!(body.into_fragments().is_empty());
    }

    #[test]
    fn test_fragments_keep_group_order_and_skip_unusable_points() {
        let body: SensorsResponse = serde_json::from_value(json!({
            "sensors": [
                {"lsid": 1, "data": [{"ts": 900, "temp": 70}, {"temp": 1}]},
                {"lsid": 2, "data": [{"ts": 900, "bar": 30.0}, "junk", {"ts": 1800, "bar": 30.1}]}
            ]
        }))
        .unwrap();

        let fragments = body.into_fragments();
        let ts: Vec<i64> = fragments.iter().map(|f| f.ts).collect();
        assert_eq!(ts, vec![900, 900, 1800]);
        assert_eq!(fragments[1].fields["bar"], json!(30.0));
    }

    #[test]
    fn test_endpoints_resolve_against_base() {
        let mut settings = ApiSettings::default();
        let client = WeatherLinkClient::new(&settings).unwrap();
        assert_eq!(
            client.endpoint("stations").unwrap().as_str(),
            "https://api.weatherlink.com/v2/stations"
        );

        settings.base_url = "http://localhost:9000/v2".into();
        let client = WeatherLinkClient::new(&settings).unwrap();
        assert_eq!(
            client.endpoint("historic/117994").unwrap().as_str(),
            "http://localhost:9000/v2/historic/117994"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let settings = ApiSettings {
            base_url: "::not a url::".into(),
            ..ApiSettings::default()
        };
        assert!(matches!(
            WeatherLinkClient::new(&settings),
            Err(SyncError::InvalidUrl(_))
        ));
    }
}

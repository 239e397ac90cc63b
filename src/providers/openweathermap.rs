//! OpenWeatherMap client (secondary weather provider).
//!
//! Current conditions and the 5-day/3-hour forecast live on separate
//! endpoints; both are requested concurrently and the 3-hourly entries are
//! folded into daily summaries.
//!
//! See: <https://openweathermap.org/current> and <https://openweathermap.org/forecast5>

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::traits::WeatherProvider;
use super::{capitalize_first, check_status, http_client, record_request};
use crate::types::{CurrentConditions, DailyForecast, WeatherRecord, timestamp_now};
use crate::{Result, WeatherError};

/// Default base URL for the OpenWeatherMap 2.5 API
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the OpenWeatherMap current + forecast APIs.
#[derive(Clone)]
pub struct OpenWeatherMapClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherMapClient {
    /// Create a client against the public endpoint.
    ///
    /// An empty key is accepted here; every fetch then fails without
    /// touching the network.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_timeout(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, location: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(WeatherError::LocationNotFound(location.to_string()));
        }

        let response = check_status(self.name(), response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            WeatherError::Upstream(format!("unexpected OpenWeatherMap /{endpoint} payload: {e}"))
        })
    }

    async fn request(&self, location: &str) -> Result<WeatherRecord> {
        if self.api_key.is_empty() {
            return Err(WeatherError::Upstream(
                "OpenWeatherMap API key is not configured".to_string(),
            ));
        }

        let (current, forecast) = tokio::try_join!(
            self.get_json::<CurrentResponse>("weather", location),
            self.get_json::<ForecastResponse>("forecast", location),
        )?;

        combine(current, forecast, self.name())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    fn name(&self) -> &str {
        "openweathermap"
    }

    fn cache_prefix(&self) -> &str {
        "openweathermap"
    }

    #[instrument(skip(self), fields(provider = "openweathermap"))]
    async fn fetch(&self, location: &str) -> Result<WeatherRecord> {
        let started = Instant::now();
        let result = self.request(location).await;
        record_request(self.name(), "weather", started, &result);
        result
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct CurrentResponse {
    name: String,
    #[serde(default)]
    sys: CurrentSys,
    /// Offset from UTC in seconds
    #[serde(default)]
    timezone: i64,
    main: CurrentMain,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
}

#[derive(Default, Deserialize)]
struct CurrentSys {
    country: Option<String>,
}

#[derive(Deserialize)]
struct CurrentMain {
    temp: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
}

#[derive(Deserialize)]
struct Condition {
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Deserialize)]
struct ForecastEntry {
    /// Unix seconds
    dt: i64,
    main: ForecastMain,
    #[serde(default)]
    weather: Vec<Condition>,
    rain: Option<Rain>,
}

#[derive(Deserialize)]
struct ForecastMain {
    temp_max: f64,
    temp_min: f64,
}

#[derive(Deserialize)]
struct Rain {
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

// ============================================================================
// Normalization
// ============================================================================

fn combine(
    current: CurrentResponse,
    forecast: ForecastResponse,
    source: &str,
) -> Result<WeatherRecord> {
    let condition = current.weather.first().ok_or_else(|| {
        WeatherError::Upstream("OpenWeatherMap response has no weather conditions".into())
    })?;

    let location = match &current.sys.country {
        Some(country) => format!("{}, {country}", current.name),
        None => current.name.clone(),
    };

    Ok(WeatherRecord {
        location,
        timezone: utc_offset_label(current.timezone),
        current: CurrentConditions {
            temp: current.main.temp,
            conditions: capitalize_first(&condition.description),
            humidity: current.main.humidity,
            wind_speed: current.wind.speed,
            icon: condition.icon.clone(),
        },
        forecast: daily_summaries(forecast.list),
        timestamp: timestamp_now(),
        source: source.to_string(),
    }
    .normalized())
}

/// Fold 3-hourly entries into one summary per UTC date.
///
/// Conditions and icon come from the first entry of each day; temperatures
/// are the day's extremes and precipitation the sum of the 3h rain amounts.
fn daily_summaries(entries: Vec<ForecastEntry>) -> Vec<DailyForecast> {
    let mut days: BTreeMap<String, DailyForecast> = BTreeMap::new();

    for entry in entries {
        let Some(date) = DateTime::from_timestamp(entry.dt, 0) else {
            continue;
        };
        let date = date.format("%Y-%m-%d").to_string();
        let rain = entry.rain.and_then(|r| r.three_hours).unwrap_or(0.0);

        let day = days.entry(date.clone()).or_insert_with(|| {
            let (conditions, icon) = entry
                .weather
                .first()
                .map(|w| (capitalize_first(&w.main), w.icon.clone()))
                .unwrap_or_default();
            DailyForecast {
                date,
                temp_max: f64::NEG_INFINITY,
                temp_min: f64::INFINITY,
                conditions,
                precipitation: 0.0,
                icon,
            }
        });

        day.temp_max = day.temp_max.max(entry.main.temp_max);
        day.temp_min = day.temp_min.min(entry.main.temp_min);
        day.precipitation += rain;
    }

    days.into_values().collect()
}

/// `"UTC+1"`, `"UTC-5"`, `"UTC+5.5"` from an offset in seconds.
fn utc_offset_label(offset_secs: i64) -> String {
    let sign = if offset_secs >= 0 { "+" } else { "" };
    if offset_secs % 3600 == 0 {
        format!("UTC{sign}{}", offset_secs / 3600)
    } else {
        format!("UTC{sign}{}", offset_secs as f64 / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dt: i64, max: f64, min: f64, rain: Option<f64>, main: &str) -> ForecastEntry {
        ForecastEntry {
            dt,
            main: ForecastMain {
                temp_max: max,
                temp_min: min,
            },
            weather: vec![Condition {
                main: main.into(),
                description: String::new(),
                icon: "10d".into(),
            }],
            rain: rain.map(|r| Rain {
                three_hours: Some(r),
            }),
        }
    }

    #[test]
    fn offset_labels() {
        assert_eq!(utc_offset_label(0), "UTC+0");
        assert_eq!(utc_offset_label(3600), "UTC+1");
        assert_eq!(utc_offset_label(-18_000), "UTC-5");
        assert_eq!(utc_offset_label(19_800), "UTC+5.5");
    }

    #[test]
    fn daily_summaries_group_by_utc_date() {
        // 2024-01-01T00:00Z, 03:00Z, then 2024-01-02T00:00Z
        let entries = vec![
            entry(1_704_067_200, 5.2, 1.1, Some(0.5), "rain"),
            entry(1_704_078_000, 7.9, 2.0, Some(1.25), "clouds"),
            entry(1_704_153_600, 3.0, -1.0, None, "snow"),
        ];

        let days = daily_summaries(entries);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2024-01-01");
        assert_eq!(days[0].temp_max, 7.9);
        assert_eq!(days[0].temp_min, 1.1);
        assert_eq!(days[0].precipitation, 1.75);
        assert_eq!(days[0].conditions, "Rain");
        assert_eq!(days[1].date, "2024-01-02");
        assert_eq!(days[1].precipitation, 0.0);
        assert_eq!(days[1].conditions, "Snow");
    }

    #[tokio::test]
    async fn empty_key_fails_without_network() {
        // Nothing listens here; the request must not be attempted.
        let client = OpenWeatherMapClient::with_base_url("", "http://127.0.0.1:1").unwrap();
        let err = client.fetch("London").await.unwrap_err();
        assert!(matches!(err, WeatherError::Upstream(_)));
    }
}

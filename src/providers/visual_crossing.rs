//! Visual Crossing Timeline API client (primary weather provider).
//!
//! See: <https://www.visualcrossing.com/resources/documentation/weather-api/timeline-weather-api/>

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::traits::WeatherProvider;
use super::{check_status, http_client, record_request};
use crate::types::{CurrentConditions, DailyForecast, WeatherRecord, timestamp_now};
use crate::{Result, WeatherError};

/// Default base URL for the Timeline API
pub const DEFAULT_BASE_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Visual Crossing Timeline API.
#[derive(Clone)]
pub struct VisualCrossingClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl VisualCrossingClient {
    /// Create a client against the public endpoint.
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
            base_url: base_url.into(),
        })
    }

    /// `{base_url}/{location}`, with the location percent-encoded as one
    /// path segment.
    fn location_url(&self, location: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            WeatherError::Configuration(format!("invalid Visual Crossing URL: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                WeatherError::Configuration("Visual Crossing URL cannot be a base".to_string())
            })?
            .pop_if_empty()
            .push(location);
        Ok(url)
    }

    async fn request(&self, location: &str) -> Result<WeatherRecord> {
        let response = self
            .http
            .get(self.location_url(location)?)
            .query(&[
                ("key", self.api_key.as_str()),
                ("unitGroup", "metric"),
                ("include", "current,days"),
                ("contentType", "json"),
            ])
            .send()
            .await?;

        // Unknown locations come back as 400 "Invalid location parameter value"
        if matches!(
            response.status(),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND
        ) {
            debug!(location, status = %response.status(), "location rejected by provider");
            return Err(WeatherError::LocationNotFound(location.to_string()));
        }

        let response = check_status(self.name(), response).await?;
        let body = response.text().await?;
        let timeline: TimelineResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Upstream(format!("unexpected Visual Crossing payload: {e}")))?;

        timeline.into_record(self.name())
    }
}

#[async_trait]
impl WeatherProvider for VisualCrossingClient {
    fn name(&self) -> &str {
        "visualcrossing"
    }

    fn cache_prefix(&self) -> &str {
        "weather"
    }

    #[instrument(skip(self), fields(provider = "visualcrossing"))]
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
#[serde(rename_all = "camelCase")]
struct TimelineResponse {
    resolved_address: String,
    timezone: String,
    current_conditions: Option<TimelineCurrent>,
    #[serde(default)]
    days: Vec<TimelineDay>,
}

#[derive(Deserialize)]
struct TimelineCurrent {
    temp: Option<f64>,
    conditions: Option<String>,
    humidity: Option<f64>,
    /// km/h under `unitGroup=metric`
    windspeed: Option<f64>,
    icon: Option<String>,
}

#[derive(Deserialize)]
struct TimelineDay {
    datetime: String,
    tempmax: f64,
    tempmin: f64,
    #[serde(default)]
    conditions: String,
    precip: Option<f64>,
    #[serde(default)]
    icon: String,
}

impl TimelineResponse {
    fn into_record(self, source: &str) -> Result<WeatherRecord> {
        let current = self.current_conditions.ok_or_else(|| {
            WeatherError::Upstream("Visual Crossing response has no currentConditions".into())
        })?;
        let temp = current.temp.ok_or_else(|| {
            WeatherError::Upstream("Visual Crossing response has no current temperature".into())
        })?;

        let forecast = self
            .days
            .into_iter()
            .map(|day| DailyForecast {
                date: day.datetime,
                temp_max: day.tempmax,
                temp_min: day.tempmin,
                conditions: day.conditions,
                precipitation: day.precip.unwrap_or(0.0),
                icon: day.icon,
            })
            .collect();

        Ok(WeatherRecord {
            location: self.resolved_address,
            timezone: self.timezone,
            current: CurrentConditions {
                temp,
                conditions: current.conditions.unwrap_or_default(),
                humidity: current.humidity.unwrap_or(0.0),
                wind_speed: kmh_to_ms(current.windspeed.unwrap_or(0.0)),
                icon: current.icon.unwrap_or_default(),
            },
            forecast,
            timestamp: timestamp_now(),
            source: source.to_string(),
        }
        .normalized())
    }
}

/// km/h → m/s, one decimal.
fn kmh_to_ms(kmh: f64) -> f64 {
    (kmh / 3.6 * 10.0).round() / 10.0
}

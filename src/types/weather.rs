//! Normalized weather record shared by all providers.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of daily forecast entries kept in a record.
pub const MAX_FORECAST_DAYS: usize = 7;

/// Canonical weather record every provider payload is transformed into.
///
/// Serialized with camelCase keys; this is both the HTTP wire format and
/// the cached value format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    /// Resolved display name, e.g. "London, GB".
    pub location: String,
    pub timezone: String,
    pub current: CurrentConditions,
    pub forecast: Vec<DailyForecast>,
    /// ISO-8601 instant of the upstream fetch.
    pub timestamp: String,
    /// Provider identifier.
    pub source: String,
}

/// Current conditions block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    /// Degrees Celsius.
    pub temp: f64,
    pub conditions: String,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Metres per second.
    pub wind_speed: f64,
    pub icon: String,
}

/// One day of forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    /// ISO date (`YYYY-MM-DD`).
    pub date: String,
    pub temp_max: f64,
    pub temp_min: f64,
    pub conditions: String,
    /// Millimetres.
    pub precipitation: f64,
    pub icon: String,
}

impl WeatherRecord {
    /// Apply the record invariants: whole-degree temperatures, precipitation
    /// to two decimals, forecast sorted by date and capped at
    /// [`MAX_FORECAST_DAYS`].
    pub fn normalized(mut self) -> Self {
        self.current.temp = round_temperature(self.current.temp);
        // ISO dates sort lexicographically; the sort is stable so providers
        // that already return chronological order are left untouched.
        self.forecast.sort_by(|a, b| a.date.cmp(&b.date));
        self.forecast.truncate(MAX_FORECAST_DAYS);
        for day in &mut self.forecast {
            day.temp_max = round_temperature(day.temp_max);
            day.temp_min = round_temperature(day.temp_min);
            day.precipitation = round_precipitation(day.precipitation);
        }
        self
    }
}

/// Round a temperature to whole degrees.
pub fn round_temperature(value: f64) -> f64 {
    value.round()
}

/// Round precipitation to two decimals.
pub fn round_precipitation(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Current instant as an ISO-8601 string with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

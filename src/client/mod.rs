//! Client library for the weathervane HTTP API.
//!
//! [`WeatherClient`] wraps the JSON endpoints served by wvd and maps failure
//! envelopes back onto [`WeatherError`](crate::WeatherError).

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::providers::http_client;
use crate::types::{EnrichmentResult, WeatherRecord};
use crate::{Result, WeatherError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// `GET /api/weather/{location}` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub data: WeatherRecord,
    pub ai: Option<EnrichmentResult>,
}

/// `GET /api/weather/{location}/visualization` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationResponse {
    pub location: String,
    pub weather: WeatherRecord,
    pub image_url: String,
    pub timestamp: String,
}

/// `POST /api/weather/nlp` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpResponse {
    pub location: String,
    pub weather: WeatherRecord,
    pub response: String,
}

/// Typed client for a running wvd.
#[derive(Clone)]
pub struct WeatherClient {
    http: Client,
    base_url: String,
}

impl WeatherClient {
    /// Client for the server at `base_url` (e.g. `http://127.0.0.1:3000`).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = WeatherClient::new("http://127.0.0.1:3000")?;
    /// let london = client.weather("London", false).await?;
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client(DEFAULT_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `GET /health`, returned as raw JSON.
    pub async fn health(&self) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        parse(response).await
    }

    /// Current weather and forecast, optionally with AI text.
    pub async fn weather(&self, location: &str, include_ai: bool) -> Result<WeatherResponse> {
        let response = self
            .http
            .get(self.location_url(location, &[])?)
            .query(&[("includeAI", include_ai.to_string())])
            .send()
            .await?;
        parse(response).await
    }

    /// Weather plus a rendered scene.
    pub async fn visualization(&self, location: &str) -> Result<VisualizationResponse> {
        let response = self
            .http
            .get(self.location_url(location, &["visualization"])?)
            .send()
            .await?;
        parse(response).await
    }

    /// Ask a free-text question.
    pub async fn ask(&self, query: &str) -> Result<NlpResponse> {
        let response = self
            .http
            .post(format!("{}/api/weather/nlp", self.base_url))
            .json(&json!({ "query": query }))
            .send()
            .await?;
        parse(response).await
    }

    fn location_url(&self, location: &str, suffix: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| WeatherError::Configuration(format!("invalid server address: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| WeatherError::Configuration("server address cannot be a base".into()))?
            .pop_if_empty()
            .extend(["api", "weather", location])
            .extend(suffix);
        Ok(url)
    }
}

/// Decode a success envelope, or turn a failure envelope into an error.
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body: Value = response.json().await?;

    if status.is_success() {
        return Ok(serde_json::from_value(body)?);
    }

    let message = body["message"]
        .as_str()
        .unwrap_or("request failed")
        .to_string();
    Err(match status {
        StatusCode::BAD_REQUEST => WeatherError::InvalidInput(message),
        StatusCode::NOT_FOUND => WeatherError::LocationNotFound(message),
        StatusCode::TOO_MANY_REQUESTS => WeatherError::RateLimited {
            retry_after: body["retryAfter"].as_u64().map(Duration::from_secs),
        },
        _ => WeatherError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

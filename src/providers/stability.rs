//! Stability AI text-to-image client.
//!
//! See: <https://platform.stability.ai/docs/api-reference#tag/SDXL-and-SD1.6>

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::traits::ImageProvider;
use super::{check_status, http_client, record_request};
use crate::{Result, WeatherError};

/// Default text-to-image endpoint (SDXL 1.0)
pub const DEFAULT_URL: &str =
    "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// SDXL only accepts a fixed set of dimensions; 1024x1024 is one of them.
const IMAGE_SIZE: u32 = 1024;
const CFG_SCALE: f32 = 7.0;
const STEPS: u32 = 20;

/// Client for the Stability text-to-image endpoint.
#[derive(Clone)]
pub struct StabilityClient {
    api_key: String,
    http: Client,
    url: String,
}

impl StabilityClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_url(api_key, DEFAULT_URL)
    }

    /// Create a client posting to a custom URL (for testing with wiremock).
    pub fn with_url(api_key: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom URL and request timeout.
    pub fn with_timeout(
        api_key: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            http: http_client(timeout)?,
            url: url.into(),
        })
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .json(&TextToImageRequest {
                text_prompts: [TextPrompt {
                    text: prompt,
                    weight: 1.0,
                }],
                cfg_scale: CFG_SCALE,
                height: IMAGE_SIZE,
                width: IMAGE_SIZE,
                samples: 1,
                steps: STEPS,
            })
            .send()
            .await?;

        let response = check_status(self.name(), response).await?;
        let body = response.text().await?;
        let parsed: TextToImageResponse = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Upstream(format!("unexpected Stability payload: {e}")))?;

        parsed
            .artifacts
            .into_iter()
            .map(|a| a.base64)
            .find(|b| !b.is_empty())
            .map(|b| format!("data:image/png;base64,{b}"))
            .ok_or(WeatherError::EmptyResponse)
    }
}

#[async_trait]
impl ImageProvider for StabilityClient {
    fn name(&self) -> &str {
        "stability"
    }

    #[instrument(skip_all, fields(provider = "stability"))]
    async fn render(&self, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let result = self.request(prompt).await;
        record_request(self.name(), "render", started, &result);
        result
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: f32,
    height: u32,
    width: u32,
    samples: u32,
    steps: u32,
}

#[derive(Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
    weight: f32,
}

#[derive(Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Deserialize)]
struct Artifact {
    #[serde(default)]
    base64: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(TextToImageRequest {
            text_prompts: [TextPrompt {
                text: "sunny",
                weight: 1.0,
            }],
            cfg_scale: CFG_SCALE,
            height: IMAGE_SIZE,
            width: IMAGE_SIZE,
            samples: 1,
            steps: STEPS,
        })
        .unwrap();

        assert_eq!(body["text_prompts"][0]["text"], "sunny");
        assert_eq!(body["text_prompts"][0]["weight"], 1.0);
        assert_eq!(body["width"], 1024);
        assert_eq!(body["steps"], 20);
        assert_eq!(body["samples"], 1);
    }
}

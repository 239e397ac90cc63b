//! Text enrichment for weather records.
//!
//! [`Enricher::enhance`] always produces a description. The completion API
//! is tried first; any failure (missing credentials, upstream error,
//! timeout, empty reply) falls back to [`fallback_description`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::providers::CompletionProvider;
use crate::telemetry;
use crate::types::{CompletionOptions, EnrichmentResult, Message, WeatherRecord, timestamp_now};
use crate::{Result, WeatherError};

/// Default bound on one enrichment call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// At or above this temperature (°C) the day reads as hot.
const HOT_THRESHOLD: f64 = 25.0;
/// At or below this temperature (°C) the day reads as cold.
const COLD_THRESHOLD: f64 = 10.0;

/// Produces human-readable descriptions of weather records.
#[derive(Clone)]
pub struct Enricher {
    completion: Option<Arc<dyn CompletionProvider>>,
    timeout: Duration,
}

impl Enricher {
    /// `completion: None` means the rule-based description is always used.
    pub fn new(completion: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self {
            completion,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Describe `record`. Never fails.
    pub async fn enhance(&self, record: &WeatherRecord) -> EnrichmentResult {
        let description = match self.complete(record).await {
            Ok(text) => text,
            Err(e) => {
                warn!(location = %record.location, error = %e, "enrichment failed, using fallback");
                metrics::counter!(telemetry::FALLBACKS_TOTAL, "operation" => "enhance")
                    .increment(1);
                fallback_description(record)
            }
        };

        EnrichmentResult {
            description,
            timestamp: timestamp_now(),
        }
    }

    async fn complete(&self, record: &WeatherRecord) -> Result<String> {
        let provider = self
            .completion
            .as_ref()
            .ok_or(WeatherError::MissingCredentials("completion API key"))?;

        let data = serde_json::to_string(record)?;
        let messages = [Message::user(format!(
            "Based on this weather data, provide:\n\
             1. A creative weather description\n\
             2. Lifestyle recommendations\n\
             3. A visual description for image generation\n\n\
             Weather Data: {data}"
        ))];
        let options = CompletionOptions::default()
            .max_tokens(300)
            .temperature(0.7);

        let text = tokio::time::timeout(self.timeout, provider.complete(&messages, &options))
            .await
            .map_err(|_| WeatherError::Timeout)??;

        let text = text.trim();
        if text.is_empty() {
            return Err(WeatherError::EmptyResponse);
        }
        debug!(provider = provider.name(), chars = text.len(), "enrichment completed");
        Ok(text.to_string())
    }
}

/// Rule-based description from the current conditions and temperature.
pub fn fallback_description(record: &WeatherRecord) -> String {
    let conditions = record.current.conditions.to_lowercase();
    let temp = record.current.temp;

    let (sky, sky_advice) = if conditions.contains("rain") {
        ("a rainy", Some("Take an umbrella and waterproof shoes."))
    } else if conditions.contains("cloud") {
        ("a cloudy", None)
    } else if conditions.contains("sunny") || conditions.contains("clear") {
        ("a sunny", Some("Don't forget sunglasses and sunscreen."))
    } else {
        ("an unremarkable", None)
    };

    let (feel, feel_advice) = if temp >= HOT_THRESHOLD {
        ("hot", "Stay hydrated and keep to the shade around midday.")
    } else if temp <= COLD_THRESHOLD {
        ("cold", "Dress in warm layers before heading out.")
    } else {
        ("mild", "A good day for a walk or time outdoors.")
    };

    let mut description = format!(
        "Expect {sky}, {feel} day in {} with {} and a temperature of {temp}°C. {feel_advice}",
        record.location, record.current.conditions
    );
    if let Some(advice) = sky_advice {
        description.push(' ');
        description.push_str(advice);
    }
    description
}

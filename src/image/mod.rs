//! Weather scene images.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::providers::ImageProvider;
use crate::telemetry;

/// Key value shipped in sample `.env` files; treated as unset.
pub const PLACEHOLDER_API_KEY: &str = "your_stability_key_here";

const SUNNY_IMAGE: &str = "https://via.placeholder.com/512x512/FFD700/000000?text=Sunny";
const RAINY_IMAGE: &str = "https://via.placeholder.com/512x512/4169E1/FFFFFF?text=Rainy";
const CLOUDY_IMAGE: &str = "https://via.placeholder.com/512x512/808080/FFFFFF?text=Cloudy";
const SNOWY_IMAGE: &str = "https://via.placeholder.com/512x512/F0F8FF/000000?text=Snowy";
const GENERIC_IMAGE: &str = "https://via.placeholder.com/512x512/87CEEB/000000?text=Weather";

/// Whether `key` is usable as an image API credential.
pub fn is_configured_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_API_KEY
}

/// Renders weather descriptions to images, falling back to static
/// placeholders.
#[derive(Clone)]
pub struct ImageSynthesizer {
    provider: Option<Arc<dyn ImageProvider>>,
}

impl ImageSynthesizer {
    /// `provider: None` means placeholders are always returned.
    pub fn new(provider: Option<Arc<dyn ImageProvider>>) -> Self {
        Self { provider }
    }

    /// Image reference (data URI or URL) for `description`. Never fails.
    pub async fn render(&self, description: &str) -> String {
        let Some(provider) = &self.provider else {
            debug!("image API not configured, using placeholder");
            return self.fallback(description);
        };

        let prompt = format!("Weather scene: {description}. Realistic, high quality, detailed, 4k.");
        match provider.render(&prompt).await {
            Ok(image) => image,
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "image generation failed, using placeholder");
                self.fallback(description)
            }
        }
    }

    fn fallback(&self, description: &str) -> String {
        metrics::counter!(telemetry::FALLBACKS_TOTAL, "operation" => "render").increment(1);
        placeholder_image(description).to_string()
    }
}

/// Static placeholder picked by the first matching keyword.
pub fn placeholder_image(description: &str) -> &'static str {
    let description = description.to_lowercase();
    [
        ("sunny", SUNNY_IMAGE),
        ("rain", RAINY_IMAGE),
        ("cloud", CLOUDY_IMAGE),
        ("snow", SNOWY_IMAGE),
    ]
    .into_iter()
    .find(|(keyword, _)| description.contains(keyword))
    .map_or(GENERIC_IMAGE, |(_, url)| url)
}

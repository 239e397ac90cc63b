//! Builder for configuring service instances

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::Services;
use crate::cache::{CacheClient, CacheConfig, CacheStore, MemoryStore};
use crate::enrich::Enricher;
use crate::image::{ImageSynthesizer, is_configured_key};
use crate::providers::{
    CompletionProvider, ImageProvider, OpenAiClient, OpenWeatherMapClient, StabilityClient,
    VisualCrossingClient, WeatherProvider, openai, openweathermap, stability, visual_crossing,
};
use crate::query::QueryInterpreter;
use crate::weather::WeatherService;
use crate::{Result, WeatherError};

/// Which upstream serves weather data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    VisualCrossing,
    OpenWeatherMap,
}

impl FromStr for ProviderKind {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visualcrossing" | "visual_crossing" | "visual-crossing" => Ok(Self::VisualCrossing),
            "openweathermap" | "owm" => Ok(Self::OpenWeatherMap),
            other => Err(WeatherError::Configuration(format!(
                "unknown weather provider {other:?} (expected visualcrossing or openweathermap)"
            ))),
        }
    }
}

/// Main entry point for creating service instances.
pub struct Weathervane;

impl Weathervane {
    /// Create a new builder for configuring the services.
    pub fn builder() -> WeathervaneBuilder {
        WeathervaneBuilder::new()
    }
}

/// Builder for configuring service instances.
///
/// Upstreams with no credentials are left out and their components run on
/// fallbacks. Explicit `*_provider` / `cache_store` injections take
/// precedence over keys and URLs (used by tests).
pub struct WeathervaneBuilder {
    provider_kind: ProviderKind,
    weather_key: Option<String>,
    weather_url: Option<String>,
    openweathermap_key: Option<String>,
    openweathermap_url: Option<String>,
    openai_key: Option<String>,
    openai_url: Option<String>,
    openai_model: Option<String>,
    stability_key: Option<String>,
    stability_url: Option<String>,
    redis_url: Option<String>,
    redis_max_memory: Option<String>,
    cache_ttl: Duration,
    reprobe_interval: Option<Duration>,
    weather_timeout_secs: Option<u64>,
    query_timeout_secs: Option<u64>,
    enrich_timeout_secs: Option<u64>,
    weather_provider: Option<Arc<dyn WeatherProvider>>,
    completion_provider: Option<Arc<dyn CompletionProvider>>,
    image_provider: Option<Arc<dyn ImageProvider>>,
    cache_store: Option<Arc<dyn CacheStore>>,
}

impl WeathervaneBuilder {
    pub fn new() -> Self {
        Self {
            provider_kind: ProviderKind::default(),
            weather_key: None,
            weather_url: None,
            openweathermap_key: None,
            openweathermap_url: None,
            openai_key: None,
            openai_url: None,
            openai_model: None,
            stability_key: None,
            stability_url: None,
            redis_url: None,
            redis_max_memory: None,
            cache_ttl: crate::cache::DEFAULT_TTL,
            reprobe_interval: None,
            weather_timeout_secs: None,
            query_timeout_secs: None,
            enrich_timeout_secs: None,
            weather_provider: None,
            completion_provider: None,
            image_provider: None,
            cache_store: None,
        }
    }

    /// Select the weather upstream (default: Visual Crossing).
    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.provider_kind = kind;
        self
    }

    /// Configure Visual Crossing.
    pub fn visual_crossing(mut self, api_key: impl Into<String>) -> Self {
        self.weather_key = Some(api_key.into());
        self
    }

    /// Override the Visual Crossing base URL.
    pub fn visual_crossing_url(mut self, url: impl Into<String>) -> Self {
        self.weather_url = Some(url.into());
        self
    }

    /// Configure OpenWeatherMap.
    pub fn openweathermap(mut self, api_key: impl Into<String>) -> Self {
        self.openweathermap_key = Some(api_key.into());
        self
    }

    /// Override the OpenWeatherMap base URL.
    pub fn openweathermap_url(mut self, url: impl Into<String>) -> Self {
        self.openweathermap_url = Some(url.into());
        self
    }

    /// Configure the OpenAI completion API (enrichment and query answers).
    pub fn openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai_key = Some(api_key.into());
        self
    }

    /// Override the OpenAI base URL (any compatible server).
    pub fn openai_url(mut self, url: impl Into<String>) -> Self {
        self.openai_url = Some(url.into());
        self
    }

    /// Set the completion model.
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    /// Configure Stability text-to-image.
    pub fn stability(mut self, api_key: impl Into<String>) -> Self {
        self.stability_key = Some(api_key.into());
        self
    }

    /// Override the Stability endpoint URL.
    pub fn stability_url(mut self, url: impl Into<String>) -> Self {
        self.stability_url = Some(url.into());
        self
    }

    /// Cache in Redis at `url` instead of in process.
    pub fn redis(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Memory cap applied to Redis on connect (e.g. `"100mb"`).
    pub fn redis_max_memory(mut self, limit: impl Into<String>) -> Self {
        self.redis_max_memory = Some(limit.into());
        self
    }

    /// Time-to-live for cached weather records.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Minimum gap between lazy cache re-probes while the store is down.
    pub fn reprobe_interval(mut self, interval: Duration) -> Self {
        self.reprobe_interval = Some(interval);
        self
    }

    /// Timeout for weather provider requests (seconds).
    pub fn timeout(mut self, secs: u64) -> Self {
        self.weather_timeout_secs = Some(secs);
        self
    }

    /// Timeout for query interpretation completions (seconds).
    pub fn query_timeout(mut self, secs: u64) -> Self {
        self.query_timeout_secs = Some(secs);
        self
    }

    /// Timeout for enrichment completions (seconds).
    pub fn enrich_timeout(mut self, secs: u64) -> Self {
        self.enrich_timeout_secs = Some(secs);
        self
    }

    /// Use `provider` for weather data, ignoring provider keys.
    pub fn weather_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.weather_provider = Some(provider);
        self
    }

    /// Use `provider` for completions, ignoring the OpenAI key.
    pub fn completion_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion_provider = Some(provider);
        self
    }

    /// Use `provider` for images, ignoring the Stability key.
    pub fn image_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.image_provider = Some(provider);
        self
    }

    /// Use `store` as the cache backend, ignoring the Redis URL.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Build the services.
    pub fn build(self) -> Result<Services> {
        let store = match self.cache_store.clone() {
            Some(store) => store,
            None => self.build_store()?,
        };
        let mut cache_config = CacheConfig::new().ttl(self.cache_ttl);
        if let Some(interval) = self.reprobe_interval {
            cache_config = cache_config.reprobe_interval(interval);
        }
        let cache = Arc::new(CacheClient::new(store, cache_config));

        let weather_provider = match self.weather_provider.clone() {
            Some(provider) => provider,
            None => self.build_weather_provider()?,
        };

        let completion = match self.completion_provider.clone() {
            Some(provider) => Some(provider),
            None => self.build_completion_provider()?,
        };
        if completion.is_none() {
            info!("no completion API configured, enrichment and queries use fallbacks");
        }

        let images = match self.image_provider.clone() {
            Some(provider) => Some(provider),
            None => self.build_image_provider()?,
        };
        if images.is_none() {
            info!("no image API configured, visualizations use placeholders");
        }

        let mut enricher = Enricher::new(completion.clone());
        if let Some(secs) = self.enrich_timeout_secs {
            enricher = enricher.timeout(Duration::from_secs(secs));
        }

        let mut interpreter = QueryInterpreter::new(completion);
        if let Some(secs) = self.query_timeout_secs {
            interpreter = interpreter.timeout(Duration::from_secs(secs));
        }

        Ok(Services {
            weather: WeatherService::new(cache.clone(), weather_provider),
            cache,
            enricher,
            interpreter,
            images: ImageSynthesizer::new(images),
        })
    }

    fn build_store(&self) -> Result<Arc<dyn CacheStore>> {
        match self.redis_url.as_deref().filter(|url| !url.is_empty()) {
            #[cfg(feature = "redis")]
            Some(url) => {
                let mut store = crate::cache::redis::RedisStore::open(url)?;
                if let Some(limit) = &self.redis_max_memory {
                    store = store.max_memory(limit.clone());
                }
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "redis"))]
            Some(_) => Err(WeatherError::Configuration(
                "a Redis URL is configured but the `redis` feature is disabled".to_string(),
            )),
            None => Ok(Arc::new(MemoryStore::default())),
        }
    }

    fn build_weather_provider(&self) -> Result<Arc<dyn WeatherProvider>> {
        let timeout = Duration::from_secs(self.weather_timeout_secs.unwrap_or(10));

        match self.provider_kind {
            ProviderKind::VisualCrossing => {
                let key = self.weather_key.clone().unwrap_or_default();
                if key.is_empty() {
                    warn!("Visual Crossing API key is not configured");
                }
                let url = self
                    .weather_url
                    .clone()
                    .unwrap_or_else(|| visual_crossing::DEFAULT_BASE_URL.to_string());
                Ok(Arc::new(VisualCrossingClient::with_timeout(
                    key, url, timeout,
                )?))
            }
            ProviderKind::OpenWeatherMap => {
                let key = self.openweathermap_key.clone().unwrap_or_default();
                if key.is_empty() {
                    warn!("OpenWeatherMap API key is not configured");
                }
                let url = self
                    .openweathermap_url
                    .clone()
                    .unwrap_or_else(|| openweathermap::DEFAULT_BASE_URL.to_string());
                Ok(Arc::new(OpenWeatherMapClient::with_timeout(
                    key, url, timeout,
                )?))
            }
        }
    }

    fn build_completion_provider(&self) -> Result<Option<Arc<dyn CompletionProvider>>> {
        let Some(key) = self.openai_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let url = self.openai_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL);
        let mut client = OpenAiClient::with_base_url(key, url)?;
        if let Some(model) = &self.openai_model {
            client = client.model(model.clone());
        }
        Ok(Some(Arc::new(client)))
    }

    fn build_image_provider(&self) -> Result<Option<Arc<dyn ImageProvider>>> {
        let Some(key) = self.stability_key.as_deref().filter(|k| is_configured_key(k)) else {
            return Ok(None);
        };
        let url = self.stability_url.as_deref().unwrap_or(stability::DEFAULT_URL);
        Ok(Some(Arc::new(StabilityClient::with_url(key, url)?)))
    }
}

impl Default for WeathervaneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

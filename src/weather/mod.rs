//! Cache-or-fetch weather lookups.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::Result;
use crate::cache::{CacheClient, build_key};
use crate::providers::WeatherProvider;
use crate::types::WeatherRecord;

/// Weather fetcher: consults the cache, falls through to the configured
/// provider on a miss and writes the result back.
pub struct WeatherService {
    cache: Arc<CacheClient>,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherService {
    pub fn new(cache: Arc<CacheClient>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self { cache, provider }
    }

    /// Name of the active provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Shared cache handle.
    pub fn cache(&self) -> &Arc<CacheClient> {
        &self.cache
    }

    /// Cache key for `location` under the active provider's namespace.
    pub fn cache_key(&self, location: &str) -> String {
        build_key(self.provider.cache_prefix(), &json!({ "location": location }))
    }

    /// Return the weather for `location`, from cache when fresh.
    ///
    /// Concurrent misses for one key may both reach the provider; the last
    /// write wins. A failed cache write does not fail the fetch.
    pub async fn fetch(&self, location: &str) -> Result<WeatherRecord> {
        let key = self.cache_key(location);

        if let Some(record) = self.cache.get::<WeatherRecord>(&key).await {
            info!(location, "cache hit");
            return Ok(record);
        }

        info!(location, provider = self.provider.name(), "fetching fresh weather data");
        let record = self.provider.fetch(location).await?;

        if !self.cache.set(&key, &record, None).await {
            warn!(location, "weather record not cached");
        }
        Ok(record)
    }

    /// Drop the cached record for `location`.
    ///
    /// Returns `false` when the cache store could not be reached.
    pub async fn invalidate(&self, location: &str) -> bool {
        let key = self.cache_key(location);
        let deleted = self.cache.delete(&key).await;
        debug!(location, deleted, "cache invalidation");
        deleted
    }
}

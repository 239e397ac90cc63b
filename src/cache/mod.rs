//! Caching subsystem.
//!
//! [`CacheClient`] is the typed front: JSON values under namespaced keys,
//! with a connectivity flag that turns every call into a no-op while the
//! backing store is unreachable. The store itself sits behind the
//! [`CacheStore`] trait:
//!
//! - [`redis::RedisStore`]: the external key-value store used in
//!   production (feature `redis`).
//! - [`MemoryStore`]: in-process bounded LRU with per-entry TTL (moka).
//!   Used when no store URL is configured, and in tests.
//!
//! # Degradation
//!
//! A failed round-trip marks the store unavailable. While unavailable,
//! `get` returns `None` and `set`/`delete` return `false` without touching
//! the store. The flag is cleared by a successful [`CacheClient::ping()`],
//! which runs on `/health` and lazily (at most once per
//! [`CacheConfig::reprobe_interval`]) when a request arrives while the
//! store is marked down.

mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryStore;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::Result;
use crate::telemetry;

/// Default entry time-to-live: 12 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(43_200);

/// Sentinel for "never probed".
const NEVER: u64 = u64::MAX;

/// Raw string key-value store with per-entry expiry.
///
/// Implementations report failures as errors; [`CacheClient`] is the layer
/// that swallows them.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch a raw value. `Ok(None)` on miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a raw value that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Round-trip health check.
    async fn ping(&self) -> Result<()>;
}

/// Configuration for the cache client.
///
/// ```rust
/// # use weathervane::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(600))
///     .reprobe_interval(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default time-to-live for entries. Default: 12 hours.
    pub ttl: Duration,
    /// Minimum gap between lazy health probes while the store is down.
    /// Default: 30 seconds.
    pub reprobe_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            reprobe_interval: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the minimum gap between lazy health probes.
    pub fn reprobe_interval(mut self, interval: Duration) -> Self {
        self.reprobe_interval = interval;
        self
    }
}

/// Typed JSON cache over a [`CacheStore`].
///
/// Never returns errors: failures are logged and reported as a miss
/// (`None`) or `false`.
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    connected: AtomicBool,
    /// Milliseconds since `epoch` of the last probe, or [`NEVER`].
    last_probe_ms: AtomicU64,
    epoch: Instant,
}

impl CacheClient {
    /// Create a client over `store`.
    ///
    /// The store starts out unprobed; the first call (or an explicit
    /// [`ping()`](Self::ping)) checks connectivity.
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            connected: AtomicBool::new(false),
            last_probe_ms: AtomicU64::new(NEVER),
            epoch: Instant::now(),
        }
    }

    /// Client over a fresh in-process [`MemoryStore`].
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(Arc::new(MemoryStore::default()), config)
    }

    /// Name of the backing store.
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Default TTL applied by [`set()`](Self::set) when none is given.
    pub fn default_ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Whether the store was reachable on the last round-trip.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Probe the store and update the connectivity flag.
    pub async fn ping(&self) -> bool {
        self.last_probe_ms.store(self.elapsed_ms(), Ordering::Release);
        match self.store.ping().await {
            Ok(()) => {
                if !self.connected.swap(true, Ordering::AcqRel) {
                    info!(store = self.store.name(), "cache store connected");
                }
                true
            }
            Err(e) => {
                self.mark_unavailable(&e);
                false
            }
        }
    }

    /// Look up `key` and deserialize it.
    ///
    /// Returns `None` on miss, on malformed stored JSON, and while the
    /// store is unavailable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let prefix = key_prefix(key).to_owned();
        if !self.ensure_available().await {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "prefix" => prefix).increment(1);
            return None;
        }

        let raw = match self.store.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.mark_unavailable(&e);
                None
            }
        };

        let value = raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "discarding malformed cache entry");
                None
            }
        });

        if value.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "prefix" => prefix).increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "prefix" => prefix).increment(1);
        }
        value
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// `ttl` defaults to [`CacheConfig::ttl`]. Returns `false` if the value
    /// was not stored.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        if !self.ensure_available().await {
            debug!(key, "cache unavailable, skipping set");
            return false;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache value");
                return false;
            }
        };

        match self
            .store
            .set(key, raw, ttl.unwrap_or(self.config.ttl))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                self.mark_unavailable(&e);
                false
            }
        }
    }

    /// Remove `key`. Returns `false` if the store could not be reached.
    pub async fn delete(&self, key: &str) -> bool {
        if !self.ensure_available().await {
            debug!(key, "cache unavailable, skipping delete");
            return false;
        }

        match self.store.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                self.mark_unavailable(&e);
                false
            }
        }
    }

    /// Connected, or a lazy probe is due and succeeds.
    async fn ensure_available(&self) -> bool {
        if self.is_connected() {
            return true;
        }

        let last = self.last_probe_ms.load(Ordering::Acquire);
        let now = self.elapsed_ms();
        let interval = u64::try_from(self.config.reprobe_interval.as_millis()).unwrap_or(u64::MAX);
        let due = last == NEVER || now.saturating_sub(last) >= interval;
        if !due {
            return false;
        }

        // Only the task that claims the slot probes; the others skip the cache.
        if self
            .last_probe_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.ping().await
    }

    fn mark_unavailable(&self, error: &crate::WeatherError) {
        if self.connected.swap(false, Ordering::AcqRel) {
            warn!(store = self.store.name(), error = %error, "cache store unavailable, caching disabled");
        } else {
            debug!(store = self.store.name(), error = %error, "cache store still unavailable");
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX - 1)
    }
}

/// Build a namespaced cache key: `"<prefix>:<json(params)>"`.
///
/// Object keys are sorted recursively before serializing, so parameter
/// objects that differ only in key order map to the same entry.
pub fn build_key(prefix: &str, params: &Value) -> String {
    format!("{prefix}:{}", canonicalize(params))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn key_prefix(key: &str) -> &str {
    key.split_once(':').map_or(key, |(prefix, _)| prefix)
}

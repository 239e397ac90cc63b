//! Configuration loading for wvd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `./weathervane.toml` (working directory)
//! 3. `~/.config/weathervane/config.toml` (user)
//! 4. `/etc/weathervane/config.toml` (system)
//!
//! With no file present the defaults apply. Environment variables then
//! override individual settings (see [`Config::apply_env`]).
//!
//! API keys never come from the TOML file; [`Secrets`] reads them from the
//! environment only.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::{Result, WeatherError};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub stability: StabilityConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0).
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind (default: 3000).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Weather provider selection.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    /// `visualcrossing` (default) or `openweathermap`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Visual Crossing base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// OpenWeatherMap base URL override.
    #[serde(default)]
    pub openweathermap_url: Option<String>,
    /// Upstream request timeout in seconds (default: 10).
    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            openweathermap_url: None,
            timeout_secs: default_weather_timeout(),
        }
    }
}

fn default_provider() -> String {
    "visualcrossing".to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

/// Cache store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Redis URL; in-process cache when unset.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Entry time-to-live in seconds (default: 43200).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Redis `maxmemory` applied on connect (e.g. "100mb").
    #[serde(default)]
    pub max_memory: Option<String>,
    /// Seconds between lazy re-probes while the store is down (default: 30).
    #[serde(default = "default_reprobe")]
    pub reprobe_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_ttl(),
            max_memory: None,
            reprobe_secs: default_reprobe(),
        }
    }
}

fn default_ttl() -> u64 {
    43_200
}

fn default_reprobe() -> u64 {
    30
}

/// Rate limiting for `/api/*`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds (default: 900).
    #[serde(default = "default_window")]
    pub window_secs: u64,
    /// Requests allowed per client per window (default: 100).
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            max_requests: default_max_requests(),
        }
    }
}

fn default_window() -> u64 {
    900
}

fn default_max_requests() -> u32 {
    100
}

/// Completion API settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Bound on one enrichment completion, in seconds (default: 15).
    #[serde(default)]
    pub enrich_timeout_secs: Option<u64>,
    /// Bound on one query interpretation completion, in seconds (default: 5).
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

/// Image API settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StabilityConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// API keys, read from the environment only.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub weather_api_key: Option<String>,
    pub openweathermap_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub stability_api_key: Option<String>,
}

impl Secrets {
    /// Read keys from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read keys through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            weather_api_key: get("WEATHER_API_KEY"),
            openweathermap_api_key: get("OPENWEATHERMAP_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            stability_api_key: get("STABILITY_API_KEY"),
        }
    }
}

impl Config {
    /// Load configuration from the standard locations, then apply
    /// environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())
    }

    /// Parse a TOML config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WeatherError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            WeatherError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path. `None` when no file exists.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(WeatherError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        let local = PathBuf::from("weathervane.toml");
        if local.exists() {
            return Ok(Some(local));
        }

        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("weathervane").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/weathervane/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Override settings from environment variables looked up through
    /// `lookup`.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(provider) = get("WEATHER_PROVIDER") {
            self.weather.provider = provider;
        }
        if let Some(url) = get("WEATHER_API_URL") {
            self.weather.base_url = Some(url);
        }
        if let Some(url) = get("OPENWEATHERMAP_API_URL") {
            self.weather.openweathermap_url = Some(url);
        }
        if let Some(url) = get("REDIS_URL") {
            self.cache.redis_url = Some(url);
        }
        if let Some(ttl) = get("CACHE_EXPIRATION") {
            self.cache.ttl_secs = parse_var("CACHE_EXPIRATION", &ttl)?;
        }
        if let Some(window) = get("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = parse_var("RATE_LIMIT_WINDOW_SECS", &window)?;
        }
        if let Some(max) = get("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_var("RATE_LIMIT_MAX_REQUESTS", &max)?;
        }
        if let Some(url) = get("OPENAI_API_URL") {
            self.openai.base_url = Some(url);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.openai.model = Some(model);
        }
        if let Some(secs) = get("ENRICH_TIMEOUT_SECS") {
            self.openai.enrich_timeout_secs = Some(parse_var("ENRICH_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = get("QUERY_TIMEOUT_SECS") {
            self.openai.query_timeout_secs = Some(parse_var("QUERY_TIMEOUT_SECS", &secs)?);
        }
        if let Some(url) = get("STABILITY_API_URL") {
            self.stability.url = Some(url);
        }

        Ok(self)
    }

    /// `host:port` to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Log filter from `RUST_LOG` as seen through `lookup`, else `default`.
///
/// Call after `.env` has been loaded so a `RUST_LOG` set there applies.
pub fn log_filter(default: &str, lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    lookup(EnvFilter::DEFAULT_ENV)
        .filter(|v| !v.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| WeatherError::Configuration(format!("Invalid {name} value {value:?}: {e}")))
}

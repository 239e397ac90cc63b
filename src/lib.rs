//! Weathervane - weather aggregation gateway
//!
//! Fetches current conditions and forecasts from a third-party weather API,
//! caches the normalized records, and optionally layers on AI-written
//! descriptions and rendered scene images. Every AI-backed component has a
//! deterministic fallback, so the service keeps answering with only a
//! weather key configured.
//!
//! # Example
//!
//! ```rust,no_run
//! use weathervane::Weathervane;
//!
//! #[tokio::main]
//! async fn main() -> weathervane::Result<()> {
//!     let services = Weathervane::builder()
//!         .visual_crossing("your-visual-crossing-key")
//!         .openai("sk-your-key")
//!         .build()?;
//!
//!     let record = services.weather.fetch("London").await?;
//!     let ai = services.enricher.enhance(&record).await;
//!
//!     println!("{}°C, {}", record.current.temp, record.current.conditions);
//!     println!("{}", ai.description);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `redis` (default): Redis cache backend
//! - `server` (default): axum HTTP surface and the `wvd` daemon
//! - `client` (default): [`client::WeatherClient`] and the `wv` CLI

pub mod cache;
#[cfg(feature = "client")]
pub mod client;
pub mod enrich;
pub mod error;
pub mod gateway;
pub mod image;
pub mod providers;
pub mod query;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;
pub mod weather;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types at crate root
pub use cache::{CacheClient, CacheConfig, CacheStore, MemoryStore, build_key};
pub use enrich::Enricher;
pub use error::{Result, WeatherError};
pub use gateway::{ProviderKind, Services, Weathervane, WeathervaneBuilder};
pub use image::ImageSynthesizer;
pub use providers::{CompletionProvider, ImageProvider, WeatherProvider};
pub use query::QueryInterpreter;
pub use weather::WeatherService;

// Re-export all types
pub use types::{
    CompletionOptions, CurrentConditions, DailyForecast, EnrichmentResult, Message, Role,
    WeatherRecord,
};

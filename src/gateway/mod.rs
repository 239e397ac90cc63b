//! Service wiring

mod builder;

pub use builder::{ProviderKind, Weathervane, WeathervaneBuilder};

use std::sync::Arc;

use crate::cache::CacheClient;
use crate::enrich::Enricher;
use crate::image::ImageSynthesizer;
use crate::query::QueryInterpreter;
use crate::weather::WeatherService;

/// Every component, constructed once at start-up and shared behind an
/// `Arc` by the HTTP surface.
pub struct Services {
    pub cache: Arc<CacheClient>,
    pub weather: WeatherService,
    pub enricher: Enricher,
    pub interpreter: QueryInterpreter,
    pub images: ImageSynthesizer,
}

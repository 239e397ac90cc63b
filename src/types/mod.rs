//! Public types for the Weathervane API.

mod enrichment;
mod message;
mod options;
mod validation;
mod weather;

pub use enrichment::EnrichmentResult;
pub use message::{Message, Role};
pub use options::CompletionOptions;
pub use validation::{MIN_LOCATION_LEN, MIN_QUERY_LEN, validate_location, validate_query};
pub use weather::{
    CurrentConditions, DailyForecast, MAX_FORECAST_DAYS, WeatherRecord, round_precipitation,
    round_temperature, timestamp_now,
};

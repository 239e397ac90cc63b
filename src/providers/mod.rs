//! Upstream API clients.
//!
//! One client per third-party API, each implementing a capability trait
//! from [`traits`]:
//!
//! - [`VisualCrossingClient`]: primary weather provider
//! - [`OpenWeatherMapClient`]: secondary weather provider
//! - [`OpenAiClient`]: chat completions (enrichment, query interpretation)
//! - [`StabilityClient`]: text-to-image

pub mod openai;
pub mod openweathermap;
pub mod stability;
pub mod traits;
pub mod visual_crossing;

pub use openai::OpenAiClient;
pub use openweathermap::OpenWeatherMapClient;
pub use stability::StabilityClient;
pub use traits::{CompletionProvider, ImageProvider, WeatherProvider};
pub use visual_crossing::VisualCrossingClient;

use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode};
use tracing::warn;

use crate::telemetry;
use crate::{Result, WeatherError};

/// Longest provider error body kept in logs.
const MAX_LOGGED_BODY: usize = 512;

/// Build an HTTP client with a whole-request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WeatherError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Pass through 2xx responses; log and convert everything else.
///
/// The provider's body is logged here and never copied into the error, so
/// it can't leak to clients.
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(
        provider,
        status = status.as_u16(),
        body = truncate(&body, MAX_LOGGED_BODY),
        "upstream returned error status"
    );

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WeatherError::AuthenticationFailed,
        _ => WeatherError::Api {
            status: status.as_u16(),
            message: format!("{provider} returned {status}"),
        },
    })
}

/// Record request count and latency for one upstream call.
pub(crate) fn record_request<T>(
    provider: &str,
    operation: &'static str,
    started: Instant,
    result: &Result<T>,
) {
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(
        telemetry::UPSTREAM_REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        telemetry::UPSTREAM_REQUEST_DURATION_SECONDS,
        "provider" => provider.to_owned(),
        "operation" => operation
    )
    .record(started.elapsed().as_secs_f64());
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Uppercase the first character (`"light rain"` → `"Light rain"`).
pub(crate) fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize() {
        assert_eq!(capitalize_first("light rain"), "Light rain");
        assert_eq!(capitalize_first("Clear"), "Clear");
        assert_eq!(capitalize_first("élan"), "Élan");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn truncate_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}

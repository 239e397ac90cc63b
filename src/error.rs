//! Weathervane error types

use std::time::Duration;

/// Weathervane error types
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    // Request errors
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("missing credentials for {0}")]
    MissingCredentials(&'static str),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from provider")]
    EmptyResponse,

    // Never surfaced to clients; the cache client degrades instead.
    #[error("cache error: {0}")]
    Cache(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WeatherError {
    /// Whether the error was caused by the caller's input rather than by
    /// this service or one of its upstreams.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WeatherError::InvalidInput(_)
                | WeatherError::LocationNotFound(_)
                | WeatherError::RateLimited { .. }
        )
    }

    /// HTTP status code this error maps to at the service boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            WeatherError::InvalidInput(_) => 400,
            WeatherError::LocationNotFound(_) => 404,
            WeatherError::RateLimited { .. } => 429,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::Timeout
        } else if err.is_decode() {
            WeatherError::Upstream(format!("malformed response body: {err}"))
        } else {
            WeatherError::Http(err.to_string())
        }
    }
}

/// Result type alias for Weathervane operations
pub type Result<T> = std::result::Result<T, WeatherError>;

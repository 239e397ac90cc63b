//! JSON envelopes and error conversion.

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::WeatherError;

/// Message returned for every upstream or internal failure.
pub const GENERIC_FAILURE: &str = "Failed to fetch weather data";

/// One rejected input field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Failure envelope: `{ success: false, message, errors? }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Vec<FieldError>,
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: Vec::new(),
            retry_after: None,
        }
    }

    /// 400 naming the offending request field.
    pub fn validation(field: &'static str, error: WeatherError) -> Self {
        let message = match error {
            WeatherError::InvalidInput(message) => message,
            other => other.to_string(),
        };
        Self {
            errors: vec![FieldError {
                field,
                message: message.clone(),
            }],
            ..Self::new(StatusCode::BAD_REQUEST, message)
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Route not found")
    }

    pub fn too_many_requests(retry_after: Duration) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later.",
            )
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match err {
            WeatherError::RateLimited { retry_after } => {
                Self::too_many_requests(retry_after.unwrap_or_default())
            }
            err if err.is_client_error() => {
                info!(status = status.as_u16(), error = %err, "request rejected");
                Self::new(status, client_message(&err))
            }
            err => {
                error!(status = status.as_u16(), error = %err, "request failed");
                Self::new(status, GENERIC_FAILURE)
            }
        }
    }
}

fn client_message(err: &WeatherError) -> String {
    match err {
        WeatherError::InvalidInput(message) => message.clone(),
        WeatherError::LocationNotFound(location) => format!("Location not found: {location}"),
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "message": self.message,
        });
        if !self.errors.is_empty() {
            body["errors"] = json!(self.errors);
        }

        let retry_secs = self.retry_after.map(|d| d.as_secs_f64().ceil().max(1.0) as u64);
        if let Some(secs) = retry_secs {
            body["retryAfter"] = json!(secs);
        }

        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = retry_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Success envelope: `{ success: true, ...payload }`.
pub fn success(payload: Value) -> Json<Value> {
    let mut body = json!({ "success": true });
    if let (Some(body), Value::Object(fields)) = (body.as_object_mut(), payload) {
        body.extend(fields);
    }
    Json(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_are_masked() {
        let err = ApiError::from(WeatherError::Api {
            status: 502,
            message: "secret provider body".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, GENERIC_FAILURE);
    }

    #[test]
    fn client_errors_keep_their_status() {
        let err = ApiError::from(WeatherError::LocationNotFound("Atlantis".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.message.contains("Atlantis"));

        let err = ApiError::from(WeatherError::InvalidInput("too short".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_lists_the_field() {
        let err = ApiError::validation("query", WeatherError::InvalidInput("too short".into()));
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "query");
    }

    #[test]
    fn success_merges_payload() {
        let Json(body) = success(json!({ "location": "Paris" }));
        assert_eq!(body, json!({ "success": true, "location": "Paris" }));
    }
}

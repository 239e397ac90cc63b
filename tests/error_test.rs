use std::time::Duration;

use weathervane::{Result, WeatherError};

#[test]
fn test_error_display() {
    let err = WeatherError::LocationNotFound("Atlantis".to_string());
    assert!(err.to_string().contains("Atlantis"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(WeatherError::EmptyResponse)
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Status mapping
// ============================================================================

#[test]
fn client_errors() {
    assert!(WeatherError::InvalidInput("too short".into()).is_client_error());
    assert!(WeatherError::LocationNotFound("Atlantis".into()).is_client_error());
    assert!(
        WeatherError::RateLimited {
            retry_after: Some(Duration::from_secs(30))
        }
        .is_client_error()
    );
}

#[test]
fn server_errors() {
    assert!(!WeatherError::Http("connection reset".into()).is_client_error());
    assert!(!WeatherError::Timeout.is_client_error());
    assert!(!WeatherError::AuthenticationFailed.is_client_error());
    assert!(!WeatherError::Upstream("missing field".into()).is_client_error());
    assert!(!WeatherError::Cache("refused".into()).is_client_error());
    assert!(
        !WeatherError::Api {
            status: 404,
            message: "not here".into()
        }
        .is_client_error()
    );
}

#[test]
fn status_codes() {
    assert_eq!(WeatherError::InvalidInput("x".into()).status_code(), 400);
    assert_eq!(WeatherError::LocationNotFound("x".into()).status_code(), 404);
    assert_eq!(
        WeatherError::RateLimited { retry_after: None }.status_code(),
        429
    );
    assert_eq!(WeatherError::AuthenticationFailed.status_code(), 500);
    assert_eq!(WeatherError::MissingCredentials("weather API key").status_code(), 500);
    // upstream statuses are never passed through
    assert_eq!(
        WeatherError::Api {
            status: 503,
            message: "unavailable".into()
        }
        .status_code(),
        500
    );
}

#[test]
fn json_errors_convert() {
    let err: WeatherError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, WeatherError::Json(_)));
    assert_eq!(err.status_code(), 500);
}

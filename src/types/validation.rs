//! Request input validation.

use crate::{Result, WeatherError};

/// Minimum length of a location path parameter.
pub const MIN_LOCATION_LEN: usize = 2;

/// Minimum length of a free-text weather query.
pub const MIN_QUERY_LEN: usize = 5;

/// Validate a location, returning it trimmed.
pub fn validate_location(location: &str) -> Result<&str> {
    let trimmed = location.trim();
    if trimmed.chars().count() < MIN_LOCATION_LEN {
        return Err(WeatherError::InvalidInput(format!(
            "location must be at least {MIN_LOCATION_LEN} characters"
        )));
    }
    Ok(trimmed)
}

/// Validate a free-text query, returning it trimmed.
pub fn validate_query(query: Option<&str>) -> Result<&str> {
    let trimmed = query.map(str::trim).unwrap_or_default();
    if trimmed.chars().count() < MIN_QUERY_LEN {
        return Err(WeatherError::InvalidInput(format!(
            "query must be at least {MIN_QUERY_LEN} characters"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_too_short() {
        assert!(validate_location("a").is_err());
        assert!(validate_location("  a ").is_err());
    }

    #[test]
    fn location_is_trimmed() {
        assert_eq!(validate_location(" London ").unwrap(), "London");
    }

    #[test]
    fn location_counts_chars_not_bytes() {
        // one char, two bytes
        assert!(validate_location("é").is_err());
        assert!(validate_location("Åb").is_ok());
    }

    #[test]
    fn query_missing_or_short() {
        assert!(validate_query(None).is_err());
        assert!(validate_query(Some("rain")).is_err());
        assert!(validate_query(Some("   hi    ")).is_err());
    }

    #[test]
    fn query_accepted() {
        assert_eq!(
            validate_query(Some("Is it raining in Oslo?")).unwrap(),
            "Is it raining in Oslo?"
        );
    }
}

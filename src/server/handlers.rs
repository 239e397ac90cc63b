//! `/api/weather` handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use super::AppState;
use super::response::{ApiError, GENERIC_FAILURE, success};
use crate::types::{timestamp_now, validate_location, validate_query};

type ApiResult = std::result::Result<Json<Value>, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherParams {
    /// Only the literal `"true"` enables enrichment.
    #[serde(default)]
    include_ai: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NlpRequest {
    #[serde(default)]
    query: Option<String>,
}

/// `GET /api/weather/{location}?includeAI=true|false`
pub async fn weather(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(params): Query<WeatherParams>,
) -> ApiResult {
    let location = validate_location(&location).map_err(|e| ApiError::validation("location", e))?;
    let services = &state.services;

    let record = services.weather.fetch(location).await?;
    let ai = if params.include_ai.as_deref() == Some("true") {
        Some(services.enricher.enhance(&record).await)
    } else {
        None
    };

    Ok(success(json!({ "data": record, "ai": ai })))
}

/// `GET /api/weather/{location}/visualization`
pub async fn visualization(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> ApiResult {
    let location = validate_location(&location).map_err(|e| ApiError::validation("location", e))?;
    let services = &state.services;

    let record = services.weather.fetch(location).await?;
    let enrichment = services.enricher.enhance(&record).await;
    if enrichment.description.trim().is_empty() {
        error!(location, "enrichment produced an empty description");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            GENERIC_FAILURE,
        ));
    }

    let image_url = services.images.render(&enrichment.description).await;
    Ok(success(json!({
        "location": record.location,
        "weather": record,
        "imageUrl": image_url,
        "timestamp": timestamp_now(),
    })))
}

/// `POST /api/weather/nlp` with `{ "query": "..." }`
pub async fn nlp(
    State(state): State<AppState>,
    body: std::result::Result<Json<NlpRequest>, JsonRejection>,
) -> ApiResult {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            info!(error = %rejection, "unreadable nlp request body");
            NlpRequest::default()
        }
    };
    let query = validate_query(request.query.as_deref())
        .map_err(|e| ApiError::validation("query", e))?;
    let services = &state.services;

    let Some(location) = services.interpreter.extract_location(query).await else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Could not determine location from your query",
        ));
    };

    let record = services.weather.fetch(&location).await?;
    let response = services.interpreter.answer(query, &record).await;

    Ok(success(json!({
        "location": location,
        "weather": record,
        "response": response,
    })))
}

//! End-to-end tests: the HTTP router served in-process over a mocked
//! weather upstream, driven through `WeatherClient` and raw requests.

#![cfg(all(feature = "server", feature = "client"))]

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weathervane::client::WeatherClient;
use weathervane::server::config::RateLimitConfig;
use weathervane::server::{router, serve};
use weathervane::{Services, WeatherError, Weathervane};

fn timeline(location: &str, temp: f64, conditions: &str) -> Value {
    json!({
        "resolvedAddress": location,
        "timezone": "Europe/London",
        "currentConditions": {
            "temp": temp,
            "conditions": conditions,
            "humidity": 60.0,
            "windspeed": 10.8,
            "icon": "clear-day"
        },
        "days": [
            {
                "datetime": "2025-06-01",
                "tempmax": 23.0,
                "tempmin": 14.0,
                "conditions": conditions,
                "precip": 0.0,
                "icon": "clear-day"
            }
        ]
    })
}

async fn upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/timeline/London$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(
            "London, England, United Kingdom",
            20.0,
            "Clear",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/timeline/Paris$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(
            "Paris, Île-de-France, France",
            17.0,
            "Rain",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/timeline/Atlantis$"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid location"))
        .mount(&server)
        .await;
    server
}

fn services(upstream: &MockServer) -> Services {
    Weathervane::builder()
        .visual_crossing("test-key")
        .visual_crossing_url(format!("{}/timeline", upstream.uri()))
        .build()
        .unwrap()
}

async fn start_server(services: Services, limits: RateLimitConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(services), &limits).unwrap();
    tokio::spawn(async move {
        serve(listener, app, std::future::pending()).await.unwrap();
    });
    format!("http://{addr}")
}

async fn start(upstream: &MockServer) -> String {
    start_server(services(upstream), RateLimitConfig::default()).await
}

#[tokio::test]
async fn weather_for_known_location() {
    let upstream = upstream().await;
    let base = start(&upstream).await;

    let body: Value = reqwest::get(format!("{base}/api/weather/London"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["location"], "London, England, United Kingdom");
    assert_eq!(body["data"]["current"]["temp"], 20.0);
    assert_eq!(body["data"]["current"]["windSpeed"], 3.0);
    assert!(body["ai"].is_null());
}

#[tokio::test]
async fn weather_with_ai_uses_fallback_text() {
    let upstream = upstream().await;
    let client = WeatherClient::new(start(&upstream).await).unwrap();

    let response = client.weather("London", true).await.unwrap();
    let ai = response.ai.unwrap();
    assert!(ai.description.contains("sunny"));
    assert!(ai.description.contains("London"));
}

#[tokio::test]
async fn short_location_is_rejected() {
    let upstream = upstream().await;
    let base = start(&upstream).await;

    let response = reqwest::get(format!("{base}/api/weather/a")).await.unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["field"], "location");
}

#[tokio::test]
async fn unknown_location_is_404() {
    let upstream = upstream().await;
    let client = WeatherClient::new(start(&upstream).await).unwrap();

    let err = client.weather("Atlantis", false).await.unwrap_err();
    assert!(matches!(err, WeatherError::LocationNotFound(_)));
}

#[tokio::test]
async fn upstream_failure_is_masked() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("secret upstream detail"))
        .mount(&upstream)
        .await;
    let base = start(&upstream).await;

    let response = reqwest::get(format!("{base}/api/weather/London")).await.unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to fetch weather data");
}

#[tokio::test]
async fn visualization_returns_placeholder_without_image_api() {
    let upstream = upstream().await;
    let client = WeatherClient::new(start(&upstream).await).unwrap();

    let response = client.visualization("London").await.unwrap();
    assert_eq!(response.location, "London, England, United Kingdom");
    assert!(response.image_url.contains("text=Sunny"));
    assert!(response.timestamp.ends_with('Z'));
}

#[tokio::test]
async fn nlp_requires_a_query() {
    let upstream = upstream().await;
    let base = start(&upstream).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{base}/api/weather/nlp"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"][0]["field"], "query");

    let response = http
        .post(format!("{base}/api/weather/nlp"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn nlp_answers_from_heuristics() {
    let upstream = upstream().await;
    let client = WeatherClient::new(start(&upstream).await).unwrap();

    let response = client.ask("What is the weather like in Paris?").await.unwrap();
    assert_eq!(response.location, "Paris");
    assert_eq!(response.weather.current.conditions, "Rain");
    assert_eq!(
        response.response,
        "The weather in Paris, Île-de-France, France is rain with a temperature of 17°C."
    );
}

#[tokio::test]
async fn nlp_without_location_is_400() {
    let upstream = upstream().await;
    let client = WeatherClient::new(start(&upstream).await).unwrap();

    let err = client.ask("is it going to be cold?").await.unwrap_err();
    assert!(
        matches!(err, WeatherError::InvalidInput(ref m) if m == "Could not determine location from your query")
    );
}

#[tokio::test]
async fn nlp_contraction_is_not_sent_upstream() {
    let upstream = upstream().await;
    let client = WeatherClient::new(start(&upstream).await).unwrap();

    let err = client
        .ask("How's the weather in london today?")
        .await
        .unwrap_err();
    assert!(
        matches!(err, WeatherError::InvalidInput(ref m) if m == "Could not determine location from your query")
    );
    let requests = upstream.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn health_reports_cache_and_provider() {
    let upstream = upstream().await;
    let client = WeatherClient::new(start(&upstream).await).unwrap();

    let health = client.health().await.unwrap();
    assert_eq!(health["status"], "OK");
    assert_eq!(health["redis"], "connected");
    assert_eq!(health["cacheStore"], "memory");
    assert_eq!(health["provider"], "visualcrossing");
    assert_eq!(health["version"], weathervane::PKG_VERSION);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let upstream = upstream().await;
    let base = start(&upstream).await;

    let response = reqwest::get(format!("{base}/api/nothing/here/at/all")).await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn rate_limit_applies_to_api_only() {
    let upstream = upstream().await;
    let base = start_server(
        services(&upstream),
        RateLimitConfig {
            window_secs: 900,
            max_requests: 2,
        },
    )
    .await;

    for _ in 0..2 {
        let response = reqwest::get(format!("{base}/api/weather/London")).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = reqwest::get(format!("{base}/api/weather/London")).await.unwrap();
    assert_eq!(response.status(), 429);
    assert!(response.headers().contains_key("retry-after"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["retryAfter"].as_u64().unwrap() >= 1);

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let client = WeatherClient::new(base).unwrap();
    let err = client.weather("London", false).await.unwrap_err();
    assert!(matches!(err, WeatherError::RateLimited { retry_after: Some(_) }));
}

//! Tests for query interpretation: location extraction and answers.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weathervane::QueryInterpreter;
use weathervane::providers::OpenAiClient;
use weathervane::types::{CurrentConditions, WeatherRecord};

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

fn paris() -> WeatherRecord {
    WeatherRecord {
        location: "Paris, Île-de-France, France".into(),
        timezone: "Europe/Paris".into(),
        current: CurrentConditions {
            temp: 16.0,
            conditions: "Rain".into(),
            humidity: 88.0,
            wind_speed: 5.5,
            icon: "rain".into(),
        },
        forecast: vec![],
        timestamp: "2025-04-01T08:00:00.000Z".into(),
        source: "test".into(),
    }
}

async fn interpreter(server: &MockServer) -> QueryInterpreter {
    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    QueryInterpreter::new(Some(Arc::new(client)))
}

#[tokio::test]
async fn heuristics_find_paris_when_api_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let location = interpreter(&server)
        .await
        .extract_location("What's the weather in Paris?")
        .await;
    assert_eq!(location.as_deref(), Some("Paris"));
}

#[tokio::test]
async fn heuristics_without_any_provider() {
    let interpreter = QueryInterpreter::new(None);
    assert_eq!(
        interpreter
            .extract_location("What is the weather like in Paris?")
            .await
            .as_deref(),
        Some("Paris")
    );
    assert!(
        interpreter
            .extract_location("is it cold outside?")
            .await
            .is_none()
    );
}

#[tokio::test]
async fn completion_reply_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "max_tokens": 50 })))
        .respond_with(reply("Buenos Aires"))
        .expect(1)
        .mount(&server)
        .await;

    let location = interpreter(&server)
        .await
        .extract_location("how hot does it get down in buenos aires in january")
        .await;
    assert_eq!(location.as_deref(), Some("Buenos Aires"));
}

#[tokio::test]
async fn unknown_reply_falls_through_to_heuristics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("Unknown"))
        .mount(&server)
        .await;

    let location = interpreter(&server)
        .await
        .extract_location("Is it sunny for Rome today?")
        .await;
    assert_eq!(location.as_deref(), Some("Rome"));
}

#[tokio::test]
async fn answer_uses_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "max_tokens": 200 })))
        .respond_with(reply("Bring an umbrella, it's raining in Paris."))
        .mount(&server)
        .await;

    let answer = interpreter(&server)
        .await
        .answer("Do I need an umbrella in Paris?", &paris())
        .await;
    assert_eq!(answer, "Bring an umbrella, it's raining in Paris.");
}

#[tokio::test]
async fn answer_falls_back_to_template() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let answer = interpreter(&server)
        .await
        .answer("What's the temperature in Paris?", &paris())
        .await;
    assert_eq!(
        answer,
        "The current temperature in Paris, Île-de-France, France is 16°C."
    );
}

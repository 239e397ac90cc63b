//! Tests for text enrichment: OpenAI-backed path and rule-based fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weathervane::providers::{CompletionProvider, OpenAiClient};
use weathervane::types::{CompletionOptions, CurrentConditions, Message, WeatherRecord};
use weathervane::{Enricher, Result, WeatherError, Weathervane};

fn record(conditions: &str, temp: f64) -> WeatherRecord {
    WeatherRecord {
        location: "Madrid, Spain".into(),
        timezone: "Europe/Madrid".into(),
        current: CurrentConditions {
            temp,
            conditions: conditions.into(),
            humidity: 30.0,
            wind_speed: 3.0,
            icon: "clear-day".into(),
        },
        forecast: vec![],
        timestamp: "2025-07-01T12:00:00.000Z".into(),
        source: "test".into(),
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

struct AlwaysFails;

#[async_trait]
impl CompletionProvider for AlwaysFails {
    fn name(&self) -> &str {
        "always-fails"
    }

    async fn complete(&self, _messages: &[Message], _options: &CompletionOptions) -> Result<String> {
        Err(WeatherError::Api {
            status: 503,
            message: "unavailable".into(),
        })
    }
}

#[tokio::test]
async fn uses_completion_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-3.5-turbo", "max_tokens": 300 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("  A blazing Madrid afternoon.  ")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let enricher = Enricher::new(Some(Arc::new(client)));

    let result = enricher.enhance(&record("Clear", 34.0)).await;
    assert_eq!(result.description, "A blazing Madrid afternoon.");
    assert!(result.timestamp.ends_with('Z'));
}

#[tokio::test]
async fn always_erroring_provider_falls_back() {
    let enricher = Enricher::new(Some(Arc::new(AlwaysFails)));
    let result = enricher.enhance(&record("Clear", 34.0)).await;

    assert!(!result.description.is_empty());
    assert!(result.description.contains("sunny"));
    assert!(result.description.contains("hot"));
}

#[tokio::test]
async fn upstream_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let enricher = Enricher::new(Some(Arc::new(client)));

    let result = enricher.enhance(&record("Light rain", 6.0)).await;
    assert!(result.description.contains("rainy"));
    assert!(result.description.contains("cold"));
}

#[tokio::test]
async fn empty_reply_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let enricher = Enricher::new(Some(Arc::new(client)));

    let result = enricher.enhance(&record("Overcast clouds", 15.0)).await;
    assert!(result.description.contains("cloudy"));
    assert!(result.description.contains("mild"));
}

#[tokio::test]
async fn slow_reply_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("too late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::with_base_url("sk-test", server.uri()).unwrap();
    let enricher = Enricher::new(Some(Arc::new(client))).timeout(Duration::from_millis(100));

    let result = enricher.enhance(&record("Clear", 20.0)).await;
    assert_ne!(result.description, "too late");
    assert!(result.description.contains("Madrid"));
}

#[tokio::test]
async fn builder_applies_model_and_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let services = Weathervane::builder()
        .openai("sk-test")
        .openai_url(server.uri())
        .openai_model("gpt-4o-mini")
        .enrich_timeout(1)
        .build()
        .unwrap();

    let result = services.enricher.enhance(&record("Clear", 20.0)).await;
    assert_ne!(result.description, "too late");
    assert!(result.description.contains("Madrid"));
}

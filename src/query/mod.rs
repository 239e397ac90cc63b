//! Free-text weather question handling.
//!
//! Two steps, each with a deterministic fallback when the completion API is
//! unavailable or misbehaves:
//!
//! 1. [`QueryInterpreter::extract_location`]: pull a place name out of the
//!    question. Falls back to [`heuristic_location`].
//! 2. [`QueryInterpreter::answer`]: answer the question from a fetched
//!    record. Falls back to [`template_answer`].

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::providers::CompletionProvider;
use crate::telemetry;
use crate::types::{CompletionOptions, Message, WeatherRecord};
use crate::{Result, WeatherError};

/// Default bound on one completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered location patterns; the first capture wins.
static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:in|at|for)\s+([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*)",
        r"\b([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*)\s+weather\b",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static CAPITALIZED_WORD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Za-z'-]+").ok());

/// Capitalized words that open sentences rather than name places.
///
/// Matched after a trailing `'s` is dropped, so "How's" counts as "How".
const SENTENCE_OPENERS: &[&str] = &[
    "What", "Whats", "How", "Hows", "Will", "Is", "It", "Are", "Does", "Do", "Can", "Should",
    "When", "Where", "Which", "Who", "Why", "That", "There", "Let", "Tell", "Show", "Give",
    "Please", "The", "Weather", "Today", "Tomorrow",
];

/// Replies the model uses to say it found nothing.
const NO_LOCATION_REPLIES: &[&str] = &["unknown", "none", "n/a", "null"];

/// Interprets free-text weather questions.
#[derive(Clone)]
pub struct QueryInterpreter {
    completion: Option<Arc<dyn CompletionProvider>>,
    timeout: Duration,
}

impl QueryInterpreter {
    /// `completion: None` means only the heuristics are used.
    pub fn new(completion: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self {
            completion,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Find the location a question is about, if any.
    pub async fn extract_location(&self, query: &str) -> Option<String> {
        let messages = [
            Message::system(
                "Extract the location from this weather query. Return only the location name, \
                 or \"unknown\" if there is none.",
            ),
            Message::user(query),
        ];
        let options = CompletionOptions::default().max_tokens(50).temperature(0.3);

        match self.complete(&messages, &options).await {
            Ok(reply) => {
                if let Some(location) = parse_location_reply(&reply) {
                    return Some(location);
                }
                debug!(reply, "completion found no location");
            }
            Err(e) => warn!(error = %e, "location extraction failed, using heuristics"),
        }

        metrics::counter!(telemetry::FALLBACKS_TOTAL, "operation" => "extract_location")
            .increment(1);
        heuristic_location(query)
    }

    /// Answer `query` from `record`. Never fails.
    pub async fn answer(&self, query: &str, record: &WeatherRecord) -> String {
        let reply = match serde_json::to_string(record) {
            Ok(data) => {
                let messages = [
                    Message::system(
                        "You are a helpful weather assistant. Answer the user's question based \
                         on the provided weather data.",
                    ),
                    Message::user(query),
                    Message::assistant(format!("Weather data: {data}")),
                ];
                let options = CompletionOptions::default().max_tokens(200).temperature(0.7);
                self.complete(&messages, &options).await
            }
            Err(e) => Err(e.into()),
        };

        match reply {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "answer synthesis failed, using template");
                metrics::counter!(telemetry::FALLBACKS_TOTAL, "operation" => "answer")
                    .increment(1);
                template_answer(query, record)
            }
        }
    }

    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String> {
        let provider = self
            .completion
            .as_ref()
            .ok_or(WeatherError::MissingCredentials("completion API key"))?;

        let text = tokio::time::timeout(self.timeout, provider.complete(messages, options))
            .await
            .map_err(|_| WeatherError::Timeout)??;

        let text = text.trim();
        if text.is_empty() {
            return Err(WeatherError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

/// Clean up a model reply; `None` when it names no location.
fn parse_location_reply(reply: &str) -> Option<String> {
    let cleaned = reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
        .trim();
    if cleaned.is_empty()
        || NO_LOCATION_REPLIES
            .iter()
            .any(|r| cleaned.eq_ignore_ascii_case(r))
    {
        return None;
    }
    Some(cleaned.to_string())
}

/// Pattern-based location extraction.
///
/// Tries the "in/at/for X" and "X weather" patterns, then the first
/// capitalized word longer than two characters that isn't a sentence
/// opener.
pub fn heuristic_location(query: &str) -> Option<String> {
    for pattern in LOCATION_PATTERNS.iter() {
        if let Some(found) = pattern.captures(query).and_then(|c| c.get(1)) {
            let location = found.as_str().trim();
            if !location.is_empty() {
                return Some(location.to_string());
            }
        }
    }

    CAPITALIZED_WORD
        .as_ref()?
        .find_iter(query)
        .map(|m| m.as_str())
        .find(|word| word.chars().count() > 2 && !is_sentence_opener(word))
        .map(str::to_string)
}

fn is_sentence_opener(word: &str) -> bool {
    let base = word.strip_suffix("'s").unwrap_or(word);
    SENTENCE_OPENERS.contains(&base)
}

/// Keyword-driven answer built from the record fields.
pub fn template_answer(query: &str, record: &WeatherRecord) -> String {
    let query = query.to_lowercase();
    let current = &record.current;

    if query.contains("temperature") {
        format!(
            "The current temperature in {} is {}°C.",
            record.location, current.temp
        )
    } else if query.contains("condition") {
        format!(
            "Current conditions in {}: {}.",
            record.location, current.conditions
        )
    } else if query.contains("weather") {
        format!(
            "The weather in {} is {} with a temperature of {}°C.",
            record.location,
            current.conditions.to_lowercase(),
            current.temp
        )
    } else {
        format!(
            "In {} it is currently {}°C and {}, with {}% humidity and wind at {} m/s.",
            record.location,
            current.temp,
            current.conditions.to_lowercase(),
            current.humidity,
            current.wind_speed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrentConditions;

    fn record() -> WeatherRecord {
        WeatherRecord {
            location: "Paris, France".into(),
            timezone: "Europe/Paris".into(),
            current: CurrentConditions {
                temp: 18.0,
                conditions: "Partially cloudy".into(),
                humidity: 60.0,
                wind_speed: 3.5,
                icon: String::new(),
            },
            forecast: vec![],
            timestamp: String::new(),
            source: "test".into(),
        }
    }

    #[test]
    fn preposition_pattern() {
        assert_eq!(
            heuristic_location("What's the weather in Paris?").as_deref(),
            Some("Paris")
        );
        assert_eq!(
            heuristic_location("Is it raining at New York today").as_deref(),
            Some("New York")
        );
        assert_eq!(
            heuristic_location("forecast for San Francisco please").as_deref(),
            Some("San Francisco")
        );
    }

    #[test]
    fn weather_suffix_pattern() {
        assert_eq!(heuristic_location("Tokyo weather now").as_deref(), Some("Tokyo"));
    }

    #[test]
    fn capitalized_word_skips_openers() {
        assert_eq!(
            heuristic_location("Will Berlin be warm tomorrow?").as_deref(),
            Some("Berlin")
        );
    }

    #[test]
    fn nothing_to_find() {
        assert_eq!(heuristic_location("is it going to rain?"), None);
        assert_eq!(heuristic_location("What is it like?"), None);
    }

    #[test]
    fn contracted_openers_are_not_locations() {
        assert_eq!(heuristic_location("How's the weather in london today?"), None);
        assert_eq!(heuristic_location("Where's the sun gone?"), None);
        assert_eq!(heuristic_location("It's freezing, isn't it?"), None);
        assert_eq!(heuristic_location("What's it like outside?"), None);
        assert_eq!(
            heuristic_location("How's Lisbon looking this weekend?").as_deref(),
            Some("Lisbon")
        );
    }

    #[test]
    fn location_reply_parsing() {
        assert_eq!(parse_location_reply(" \"London\". ").as_deref(), Some("London"));
        assert_eq!(parse_location_reply("Unknown"), None);
        assert_eq!(parse_location_reply("none"), None);
        assert_eq!(parse_location_reply("   "), None);
    }

    #[test]
    fn template_keyword_order() {
        let r = record();
        assert_eq!(
            template_answer("What's the temperature and weather?", &r),
            "The current temperature in Paris, France is 18°C."
        );
        assert_eq!(
            template_answer("Current conditions please", &r),
            "Current conditions in Paris, France: Partially cloudy."
        );
        assert!(template_answer("How's the weather?", &r).starts_with("The weather in Paris"));
        assert!(template_answer("Should I go out?", &r).contains("60% humidity"));
    }

    #[tokio::test]
    async fn falls_back_without_provider() {
        let interpreter = QueryInterpreter::new(None);
        assert_eq!(
            interpreter
                .extract_location("What's the weather in Paris?")
                .await
                .as_deref(),
            Some("Paris")
        );
        let answer = interpreter.answer("What's the temperature?", &record()).await;
        assert!(answer.contains("18°C"));
    }
}

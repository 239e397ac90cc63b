//! Provider traits for the upstream APIs.
//!
//! Each upstream capability gets its own narrow trait so components can be
//! built against mocks in tests and so alternate upstreams (e.g. two weather
//! APIs) are interchangeable behind one contract:
//!
//! - [`WeatherProvider`]: current conditions + daily forecast
//! - [`CompletionProvider`]: chat-style text completion
//! - [`ImageProvider`]: text-to-image rendering
//!
//! Providers do a single attempt bounded by their own HTTP timeout. They
//! never retry and never fall back; fallback policy lives in the
//! components that call them.

use async_trait::async_trait;

use crate::Result;
use crate::types::{CompletionOptions, Message, WeatherRecord};

// ============================================================================
// Weather Provider
// ============================================================================

/// Upstream weather data source.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name for logging/debugging; also the record's `source`.
    fn name(&self) -> &str;

    /// Namespace for this provider's cache entries.
    fn cache_prefix(&self) -> &str;

    /// Fetch and normalize weather for a free-text location.
    ///
    /// Returns `LocationNotFound` when the upstream doesn't recognise the
    /// location, and `Upstream`/`Http`/`Api` for everything else.
    async fn fetch(&self, location: &str) -> Result<WeatherRecord>;
}

// ============================================================================
// Completion Provider
// ============================================================================

/// Chat-style text completion API.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Complete a conversation, returning the assistant's text.
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String>;
}

// ============================================================================
// Image Provider
// ============================================================================

/// Text-to-image rendering API.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Render `prompt`, returning an image reference (data URI or URL).
    async fn render(&self, prompt: &str) -> Result<String>;
}

//! Telemetry metric name constants.
//!
//! Centralised metric names for weathervane operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `weathervane_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: upstream name (e.g. "visualcrossing", "openai")
//! - `operation`: what was being done (e.g. "weather", "enhance", "render")
//! - `status`: outcome: "ok" or "error"

/// Total upstream requests made (weather, completion and image APIs).
///
/// Labels: `provider`, `operation`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "weathervane_upstream_requests_total";

/// Upstream request duration in seconds.
///
/// Labels: `provider`, `operation`.
pub const UPSTREAM_REQUEST_DURATION_SECONDS: &str =
    "weathervane_upstream_request_duration_seconds";

/// Total cache hits.
///
/// Labels: `prefix`.
pub const CACHE_HITS_TOTAL: &str = "weathervane_cache_hits_total";

/// Total cache misses (including lookups skipped while the store is down).
///
/// Labels: `prefix`.
pub const CACHE_MISSES_TOTAL: &str = "weathervane_cache_misses_total";

/// Total times a component answered with its deterministic fallback.
///
/// Labels: `operation` ("enhance" | "extract_location" | "answer" | "render").
pub const FALLBACKS_TOTAL: &str = "weathervane_fallbacks_total";

/// Total requests rejected by the HTTP rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "weathervane_rate_limited_total";

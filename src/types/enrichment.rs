//! Enrichment output

use serde::{Deserialize, Serialize};

/// AI-generated (or rule-based fallback) text layered on a weather record.
///
/// Ephemeral: recomputed per request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub description: String,
    pub timestamp: String,
}

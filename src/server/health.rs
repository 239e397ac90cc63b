//! `/health` endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::AppState;
use crate::types::timestamp_now;

/// Health report. Always `200 OK`; cache trouble only shows in `redis`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub memory: MemoryUsage,
    /// `"connected"` or `"disconnected"`.
    pub redis: &'static str,
    pub cache_store: String,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub provider: String,
}

/// Process memory in bytes; `null` where the platform doesn't expose it.
#[derive(Debug, Default, Serialize)]
pub struct MemoryUsage {
    pub rss: Option<u64>,
    #[serde(rename = "virtual")]
    pub virtual_size: Option<u64>,
}

// statm counts pages; 4 KiB on every Linux target we ship to.
const PAGE_SIZE: u64 = 4096;

impl MemoryUsage {
    pub fn current() -> Self {
        std::fs::read_to_string("/proc/self/statm")
            .map(|statm| Self::from_statm(&statm))
            .unwrap_or_default()
    }

    fn from_statm(statm: &str) -> Self {
        let mut fields = statm
            .split_whitespace()
            .map(|f| f.parse::<u64>().ok().map(|pages| pages * PAGE_SIZE));
        Self {
            virtual_size: fields.next().flatten(),
            rss: fields.next().flatten(),
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let services = &state.services;
    let redis = if services.cache.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    Json(HealthReport {
        status: "OK",
        timestamp: timestamp_now(),
        memory: MemoryUsage::current(),
        redis,
        cache_store: services.cache.store_name().to_string(),
        version: crate::PKG_VERSION,
        uptime_seconds: state.started.elapsed().as_secs(),
        provider: services.weather.provider_name().to_string(),
    })
}

//! Per-client request rate limiting for `/api/*`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota};
use tracing::debug;

use super::config::RateLimitConfig;
use super::response::ApiError;
use crate::telemetry;
use crate::{Result, WeatherError};

/// Stale client state is dropped once every this many checks.
const PRUNE_EVERY: u64 = 1024;

/// Token bucket per client IP: `max_requests` burst, refilled evenly over
/// `window_secs`.
///
/// Clients whose bucket has fully refilled are forgotten on the next prune,
/// so tracked state stays proportional to recently active clients.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    clock: DefaultClock,
    checks: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Result<Self> {
        let max = NonZeroU32::new(config.max_requests).ok_or_else(|| {
            WeatherError::Configuration("rate_limit.max_requests must be at least 1".to_string())
        })?;
        let period = Duration::from_secs(config.window_secs) / max.get();
        let quota = Quota::with_period(period)
            .ok_or_else(|| {
                WeatherError::Configuration("rate_limit.window_secs must be at least 1".to_string())
            })?
            .allow_burst(max);

        Ok(Self {
            limiter: Arc::new(DefaultKeyedRateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
            checks: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Take one request slot for `client`, or return how long to wait.
    pub fn check(&self, client: IpAddr) -> std::result::Result<(), Duration> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }

        self.limiter
            .check_key(&client)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Forget clients whose bucket has fully refilled.
    pub fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(before, after = self.limiter.len(), "pruned rate limiter state");
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Middleware rejecting over-quota clients with a 429 envelope.
pub async fn limit(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(client) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            debug!(%client, wait_ms = wait.as_millis() as u64, "rate limit exceeded");
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            ApiError::too_many_requests(wait).into_response()
        }
    }
}

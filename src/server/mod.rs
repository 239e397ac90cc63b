//! HTTP surface.
//!
//! This module provides:
//! - The axum [`router`] over shared [`Services`]
//! - JSON envelopes and error mapping (`response`)
//! - Per-client rate limiting for `/api/*` (`rate_limit`)
//! - Configuration types (`config`)
//!
//! Routes:
//!
//! | Method | Path                                   | Rate limited |
//! |--------|----------------------------------------|--------------|
//! | GET    | `/api/weather/{location}`              | yes          |
//! | GET    | `/api/weather/{location}/visualization`| yes          |
//! | POST   | `/api/weather/nlp`                     | yes          |
//! | GET    | `/health`                              | no           |

pub mod config;
mod handlers;
mod health;
mod rate_limit;
mod response;

pub use health::{HealthReport, MemoryUsage};
pub use rate_limit::RateLimiter;
pub use response::{ApiError, GENERIC_FAILURE};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::gateway::Services;
use config::RateLimitConfig;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub started: Instant,
}

/// Build the application router.
pub fn router(services: Arc<Services>, limits: &RateLimitConfig) -> Result<Router> {
    let state = AppState {
        services,
        started: Instant::now(),
    };
    let limiter = RateLimiter::new(limits)?;

    let api = Router::new()
        .route("/api/weather/nlp", post(handlers::nlp))
        .route("/api/weather/{location}", get(handlers::weather))
        .route(
            "/api/weather/{location}/visualization",
            get(handlers::visualization),
        )
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::limit));

    Ok(Router::new()
        .merge(api)
        .route("/health", get(health::health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state))
}

async fn not_found() -> impl IntoResponse {
    ApiError::not_found()
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// Client socket addresses are exposed to the rate limiter.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

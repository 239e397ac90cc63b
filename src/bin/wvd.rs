//! wvd: weathervane daemon.
//!
//! Serves the weather API over HTTP.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use weathervane::server::config::{self, Config, Secrets};
use weathervane::{ProviderKind, Services, WeatherError, Weathervane};

/// Weathervane daemon: weather aggregation API.
#[derive(Parser)]
#[command(name = "wvd")]
#[command(version = weathervane::PKG_VERSION)]
#[command(about = "Weathervane weather API daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Port to listen on (overrides config and PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env may set RUST_LOG, so it is read before the subscriber exists
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(config::log_filter(
            "weathervane=info,tower_http=info",
            |name| std::env::var(name).ok(),
        ))
        .init();

    match dotenv {
        Err(e) if !e.not_found() => warn!(error = %e, "failed to load .env file"),
        _ => {}
    }

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let secrets = Secrets::from_env();

    let services = Arc::new(build_services(&config, &secrets)?);

    let cache = &services.cache;
    if cache.ping().await {
        info!(store = cache.store_name(), "cache ready");
    } else {
        warn!(
            store = cache.store_name(),
            "cache store unreachable, continuing without caching"
        );
    }

    let app = weathervane::server::router(services.clone(), &config.rate_limit)?;
    let listener = TcpListener::bind(config.address()).await?;
    info!(
        version = weathervane::PKG_VERSION,
        addr = %listener.local_addr()?,
        provider = services.weather.provider_name(),
        "wvd starting"
    );

    weathervane::server::serve(listener, app, shutdown_signal()).await?;
    info!("wvd stopped");
    Ok(())
}

/// Build [`Services`] from configuration.
fn build_services(config: &Config, secrets: &Secrets) -> Result<Services, WeatherError> {
    let provider: ProviderKind = config.weather.provider.parse()?;

    let mut builder = Weathervane::builder()
        .provider(provider)
        .timeout(config.weather.timeout_secs)
        .cache_ttl(Duration::from_secs(config.cache.ttl_secs))
        .reprobe_interval(Duration::from_secs(config.cache.reprobe_secs));

    // Weather upstreams
    if let Some(ref key) = secrets.weather_api_key {
        builder = builder.visual_crossing(key);
    }
    if let Some(ref url) = config.weather.base_url {
        builder = builder.visual_crossing_url(url);
    }
    if let Some(ref key) = secrets.openweathermap_api_key {
        builder = builder.openweathermap(key);
    }
    if let Some(ref url) = config.weather.openweathermap_url {
        builder = builder.openweathermap_url(url);
    }

    // Completion and image upstreams; absent keys leave the fallbacks in charge
    if let Some(ref key) = secrets.openai_api_key {
        builder = builder.openai(key);
    }
    if let Some(ref url) = config.openai.base_url {
        builder = builder.openai_url(url);
    }
    if let Some(ref model) = config.openai.model {
        builder = builder.openai_model(model);
    }
    if let Some(secs) = config.openai.enrich_timeout_secs {
        builder = builder.enrich_timeout(secs);
    }
    if let Some(secs) = config.openai.query_timeout_secs {
        builder = builder.query_timeout(secs);
    }
    if let Some(ref key) = secrets.stability_api_key {
        builder = builder.stability(key);
    }
    if let Some(ref url) = config.stability.url {
        builder = builder.stability_url(url);
    }

    // Cache store
    if let Some(ref url) = config.cache.redis_url {
        builder = builder.redis(url);
    }
    if let Some(ref limit) = config.cache.max_memory {
        builder = builder.redis_max_memory(limit);
    }

    builder.build()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

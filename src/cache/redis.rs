//! Redis-backed cache store.
//!
//! The connection is opened lazily on first use and then held by a
//! [`ConnectionManager`], which reconnects on its own after the server goes
//! away. Every command is bounded by a short timeout so an unresponsive
//! server can't stall request handling; the caller
//! ([`CacheClient`](super::CacheClient)) turns the resulting error into a
//! degraded, cache-less mode.

use std::future::Future;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{Client, RedisError};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::CacheStore;
use crate::{Result, WeatherError};

/// Default connect and per-command timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Cache store talking to a Redis server.
pub struct RedisStore {
    client: Client,
    conn: OnceCell<ConnectionManager>,
    timeout: Duration,
    max_memory: Option<String>,
}

impl RedisStore {
    /// Create a store for `url` (e.g. `redis://localhost:6379`).
    ///
    /// Only parses the URL; no connection is made until the first command.
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| WeatherError::Configuration(format!("invalid redis URL: {e}")))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            timeout: DEFAULT_TIMEOUT,
            max_memory: None,
        })
    }

    /// Set the connect and per-command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply `maxmemory <limit>` with `allkeys-lru` eviction on connect
    /// (e.g. `"256mb"`).
    pub fn max_memory(mut self, limit: impl Into<String>) -> Self {
        self.max_memory = Some(limit.into());
        self
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = self
                    .bounded(ConnectionManager::new(self.client.clone()))
                    .await?;
                info!("connected to redis");
                self.apply_memory_policy(conn.clone()).await;
                Ok::<_, WeatherError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    /// Managed Redis offerings often reject `CONFIG SET`; that's not fatal.
    async fn apply_memory_policy(&self, mut conn: ConnectionManager) {
        let Some(limit) = &self.max_memory else {
            return;
        };

        let applied: Result<()> = async {
            let () = self
                .bounded(
                    ::redis::cmd("CONFIG")
                        .arg("SET")
                        .arg("maxmemory")
                        .arg(limit)
                        .query_async(&mut conn),
                )
                .await?;
            let () = self
                .bounded(
                    ::redis::cmd("CONFIG")
                        .arg("SET")
                        .arg("maxmemory-policy")
                        .arg("allkeys-lru")
                        .query_async(&mut conn),
                )
                .await?;
            Ok(())
        }
        .await;

        match applied {
            Ok(()) => info!(limit = %limit, "redis configured with memory limit"),
            Err(e) => warn!(error = %e, "could not apply redis memory policy"),
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = std::result::Result<T, RedisError>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| WeatherError::Cache(e.to_string())),
            Err(_) => Err(WeatherError::Cache(format!(
                "redis did not respond within {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        self.bounded(::redis::cmd("GET").arg(key).query_async(&mut conn))
            .await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        self.bounded(
            ::redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(secs)
                .query_async(&mut conn),
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _removed: i64 = self
            .bounded(::redis::cmd("DEL").arg(key).query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _pong: String = self
            .bounded(::redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}

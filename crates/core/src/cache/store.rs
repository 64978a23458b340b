use crate::cache::InsightsCache;
use crate::config::Settings;
use crate::domain::insights::DailyInsights;
use crate::time::nse_market;
use anyhow::{Context, Result};
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, IntoConnectionInfo};
use std::time::Duration;

const MAX_CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_BACKOFF_STEP_MS: u64 = 100;
const CONNECT_BACKOFF_CAP_MS: u64 = 3000;

/// Redis-backed store for the daily insights entry.
///
/// The connection is established lazily on the first operation and reused.
/// Construct one instance per process (or per test) and pass it explicitly;
/// there is no process-global client.
pub struct RedisCacheStore {
    client: redis::Client,
    conn: tokio::sync::Mutex<Option<MultiplexedConnection>>,
}

impl RedisCacheStore {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.require_redis_url()?;
        let mut info = url
            .into_connection_info()
            .context("REDIS_URL is not a valid redis URL")?;
        if let Some(password) = settings.redis_password.clone() {
            info.redis.password = Some(password);
        }

        let client = redis::Client::open(info).context("failed to build redis client")?;
        Ok(Self {
            client,
            conn: tokio::sync::Mutex::new(None),
        })
    }

    /// Establish the connection eagerly. A no-op when already connected, and
    /// safe to call from concurrent tasks: the connection slot is guarded, so
    /// callers never race into a double connect.
    pub async fn connect(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    /// Drop the live connection. The next operation reconnects lazily.
    pub async fn close(&self) {
        *self.conn.lock().await = None;
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => {
                    tracing::debug!(attempt, "redis connected");
                    *guard = Some(conn.clone());
                    return Ok(conn);
                }
                Err(err) => {
                    if attempt >= MAX_CONNECT_ATTEMPTS {
                        return Err(anyhow::Error::new(err).context(format!(
                            "redis connection failed after {attempt} attempts"
                        )));
                    }
                    let delay = Duration::from_millis(
                        (u64::from(attempt) * CONNECT_BACKOFF_STEP_MS).min(CONNECT_BACKOFF_CAP_MS),
                    );
                    tracing::warn!(attempt, ?delay, error = %err, "redis connect failed; retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn reset(&self) {
        *self.conn.lock().await = None;
    }
}

#[async_trait::async_trait]
impl InsightsCache for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<DailyInsights>> {
        let mut conn = self.connection().await?;
        let raw = match conn.get::<_, Option<String>>(key).await {
            Ok(raw) => raw,
            Err(err) => {
                self.reset().await;
                return Err(anyhow::Error::new(err).context(format!("redis GET failed for {key}")));
            }
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<DailyInsights>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                // Stale or corrupt payload: a miss, not a pipeline failure.
                tracing::warn!(key, error = %err, "cached payload failed to deserialize; treating as miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &DailyInsights, ttl_seconds: Option<u64>) -> Result<()> {
        let ttl = match ttl_seconds {
            Some(ttl) => ttl,
            None => nse_market::dynamic_ttl_secs(Utc::now())?,
        };
        let payload =
            serde_json::to_string(value).context("failed to serialize insights for cache")?;

        let mut conn = self.connection().await?;
        match conn.set_ex::<_, _, ()>(key, payload, ttl).await {
            Ok(()) => {
                tracing::debug!(key, ttl, "cached insights");
                Ok(())
            }
            Err(err) => {
                self.reset().await;
                Err(anyhow::Error::new(err).context(format!("redis SETEX failed for {key}")))
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        match conn.exists::<_, bool>(key).await {
            Ok(found) => Ok(found),
            Err(err) => {
                self.reset().await;
                Err(anyhow::Error::new(err).context(format!("redis EXISTS failed for {key}")))
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        match conn.del::<_, i64>(key).await {
            Ok(_removed) => Ok(()),
            Err(err) => {
                self.reset().await;
                Err(anyhow::Error::new(err).context(format!("redis DEL failed for {key}")))
            }
        }
    }
}

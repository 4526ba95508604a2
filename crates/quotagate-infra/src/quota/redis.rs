//! Redis quota store using an INCR-first fixed window counter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use quotagate_core::Policy;
use quotagate_core::QuotaStoreError;
use quotagate_core::ports::{Admission, QuotaStore};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Key prefix for counter keys
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            key_prefix: std::env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
        }
    }
}

/// Redis-backed atomic window counter.
///
/// `INCR` runs before the comparison. Redis orders all increments on a key,
/// so the value each caller gets back is unique and the check against the
/// limit is exact under any concurrency.
pub struct RedisWindowCounter {
    conn: ConnectionManager,
    config: RedisConfig,
}

impl RedisWindowCounter {
    pub async fn new(config: RedisConfig) -> Result<Self, QuotaStoreError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| QuotaStoreError::Connection(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| QuotaStoreError::Connection("Connection timed out".to_string()))?
            .map_err(|e| QuotaStoreError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis quota store");

        Ok(Self { conn, config })
    }

    fn make_key(&self, identifier: &str) -> String {
        format!("{}:{}", self.config.key_prefix, identifier)
    }

    /// Connection-level failures get their own error regardless of the step.
    fn classify(e: RedisError, step: fn(String) -> QuotaStoreError) -> QuotaStoreError {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
            QuotaStoreError::Connection(e.to_string())
        } else {
            step(e.to_string())
        }
    }

    fn window_secs(policy: &Policy) -> i64 {
        // EXPIRE has whole-second resolution; never round a window down to zero.
        policy.window().as_secs().max(1) as i64
    }
}

#[async_trait]
impl QuotaStore for RedisWindowCounter {
    async fn try_admit(
        &self,
        identifier: &str,
        _now: DateTime<Utc>,
        policy: &Policy,
    ) -> Result<Admission, QuotaStoreError> {
        let key = self.make_key(identifier);
        let mut conn = self.conn.clone();

        let count: u64 = conn
            .incr(&key, 1)
            .await
            .map_err(|e| Self::classify(e, QuotaStoreError::Increment))?;

        if count == 1 {
            conn.expire::<_, ()>(&key, Self::window_secs(policy))
                .await
                .map_err(|e| Self::classify(e, QuotaStoreError::SetExpiration))?;
        }

        let limit = u64::from(policy.limit());
        if count <= limit {
            return Ok(Admission::Allowed {
                remaining: (limit - count) as u32,
            });
        }

        // -1 means the window's first request never got its EXPIRE; without
        // one the counter would deny this identifier forever.
        let ttl: i64 = conn
            .ttl(&key)
            .await
            .map_err(|e| Self::classify(e, QuotaStoreError::ReadCounter))?;

        let retry_after = if ttl == -1 {
            tracing::warn!(key = %key, "Counter had no expiry, restoring it");
            let window = Self::window_secs(policy);
            conn.expire::<_, ()>(&key, window)
                .await
                .map_err(|e| Self::classify(e, QuotaStoreError::SetExpiration))?;
            Some(Duration::from_secs(window as u64))
        } else if ttl >= 0 {
            Some(Duration::from_secs(ttl as u64))
        } else {
            None
        };

        Ok(Admission::Denied { retry_after })
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

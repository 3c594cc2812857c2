//! Redis cache implementation over a reconnecting connection manager.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use folio_core::ports::{Cache, CacheError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    pub connect_timeout: Duration,
    /// Prefix applied to every key, so several apps can share one Redis.
    pub key_prefix: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(5),
            key_prefix: "folio".to_string(),
        }
    }

    /// Open a connection manager, giving up after `connect_timeout`.
    pub(crate) async fn connect(&self) -> Result<ConnectionManager, String> {
        let client = Client::open(self.url.as_str()).map_err(|e| e.to_string())?;
        tokio::time::timeout(self.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| "Connection timed out".to_string())?
            .map_err(|e| e.to_string())
    }
}

/// Redis-backed cache implementation.
pub struct RedisCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let conn = config.connect().await.map_err(CacheError::Connection)?;
        tracing::info!(url = %config.url, "Connected to Redis cache");

        Ok(Self {
            conn,
            key_prefix: config.key_prefix,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:cache:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(self.key(key)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);

        match ttl {
            Some(duration) => {
                conn.set_ex::<_, _, ()>(key, value, duration.as_secs().max(1))
                    .await
                    .map_err(|e| CacheError::Operation(e.to_string()))?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(|e| CacheError::Operation(e.to_string()))?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(key))
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(self.key(key)).await.unwrap_or(false)
    }
}

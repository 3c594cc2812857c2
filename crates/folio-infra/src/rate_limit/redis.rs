//! Redis rate limiter using a fixed window counter shared by all instances.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;

use folio_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

use super::RateLimitConfig;
use crate::cache::RedisConfig;

const WINDOW_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return {current, redis.call('TTL', KEYS[1])}
"#;

/// Redis-backed rate limiter.
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    config: RateLimitConfig,
    key_prefix: String,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(redis: RedisConfig, config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let conn = redis.connect().await.map_err(RateLimitError::Backend)?;
        tracing::info!(url = %redis.url, "Connected to Redis rate limiter");

        Ok(Self {
            conn,
            config,
            key_prefix: format!("{}:ratelimit", redis.key_prefix),
            script: Script::new(WINDOW_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let mut conn = self.conn.clone();
        let window_secs = self.config.window.as_secs().max(1);

        let result: Vec<i64> = self
            .script
            .key(format!("{}:{}", self.key_prefix, key))
            .arg(window_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;

        let count = result.first().copied().unwrap_or(1).max(0) as u32;
        let ttl = result.get(1).copied().unwrap_or(window_secs as i64).max(1) as u64;
        let reset_after = Duration::from_secs(ttl);

        if count <= self.config.max_requests {
            Ok(RateLimitResult::allowed(
                self.config.max_requests,
                self.config.max_requests - count,
                reset_after,
            ))
        } else {
            Ok(RateLimitResult::denied(self.config.max_requests, reset_after))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get_test_ratelimiter() -> Option<RedisRateLimiter> {
        let mut redis = RedisConfig::new(
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6389".to_string()),
        );
        redis.connect_timeout = Duration::from_secs(1);
        redis.key_prefix = format!("folio_test_{}", uuid::Uuid::new_v4());

        let config = RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(1),
        };
        RedisRateLimiter::new(redis, config).await.ok()
    }

    #[tokio::test]
    async fn test_redis_ratelimiter() {
        let Some(limiter) = get_test_ratelimiter().await else {
            return;
        };

        let res = limiter.check("10.0.0.1").await.unwrap();
        assert!(res.allowed);
        assert_eq!(res.remaining, 1);

        let res = limiter.check("10.0.0.1").await.unwrap();
        assert!(res.allowed);
        assert_eq!(res.remaining, 0);

        assert!(!limiter.check("10.0.0.1").await.unwrap().allowed);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(limiter.check("10.0.0.1").await.unwrap().allowed);
    }
}

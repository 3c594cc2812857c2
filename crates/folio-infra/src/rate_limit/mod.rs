//! Rate limiting implementations.

mod memory;

pub use memory::{InMemoryRateLimiter, PRUNE_INTERVAL, RateLimitConfig};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::RedisRateLimiter;

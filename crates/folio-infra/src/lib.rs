//! # Folio Infrastructure
//!
//! Concrete implementations of the ports defined in `folio-core`:
//! database, cache, rate limiting, OAuth clients and media storage.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL database support via SeaORM
//! - `auth` - OAuth clients, session tokens and signed OAuth state
//! - `rate-limit` - Rate limiting via governor
//! - `redis` - Redis support for cache and rate limiting

pub mod cache;
pub mod memory;
pub mod storage;

#[cfg(feature = "postgres")]
pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use memory::InMemoryStore;
pub use storage::LocalMediaStorage;

#[cfg(feature = "postgres")]
pub use database::DatabaseConnections;

#[cfg(feature = "auth")]
pub use auth::{OAuthClient, OAuthStateCodec, RandomTokenGenerator};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
#[cfg(all(feature = "redis", feature = "rate-limit"))]
pub use rate_limit::RedisRateLimiter;

#[cfg(test)]
mod tests;

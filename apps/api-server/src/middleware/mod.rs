//! Middleware modules.

pub mod auth;
pub mod error;
pub mod rate_limit;

pub use auth::{AdminIdentity, Identity, OptionalIdentity};
pub use error::{AppError, AppResult};
pub use rate_limit::RateLimitMiddleware;

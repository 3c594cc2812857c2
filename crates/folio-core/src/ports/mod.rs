//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod rate_limit;
mod repository;
mod storage;

pub use auth::{AuthError, OAuthCallback, OAuthProvider, SessionTokenGenerator};
pub use cache::{Cache, CacheError, get_json, set_json};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{
    BaseRepository, CommentRepository, LikeRepository, MediaRepository, OAuthAccountRepository,
    PostRepository, ProfileRepository, SessionRepository, UserRepository,
};
pub use storage::{MediaStorage, StorageError};

//! Application services - the business rules, written against ports only.

mod auth;
mod comment;
mod like;
mod media;
mod post;
mod profile;

pub use auth::{AuthService, DEFAULT_SESSION_TTL_HOURS};
pub use comment::CommentService;
pub use like::LikeService;
pub use media::{DEFAULT_MAX_UPLOAD_BYTES, MediaService};
pub use post::{PostService, is_visible};
pub use profile::{DEFAULT_PROFILE_TTL, PROFILE_CACHE_KEY, ProfileService};

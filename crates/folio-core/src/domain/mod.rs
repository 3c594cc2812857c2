//! Domain entities - the core business objects.

mod comment;
mod like;
mod media;
mod post;
mod profile;
mod session;
mod user;

pub use comment::{
    Comment, CommentInput, CommentNode, MAX_COMMENT_LENGTH, MAX_REPLY_DEPTH, build_thread,
    reply_depth,
};
pub use like::{LikeStatus, LikeTarget};
pub use media::{ImageFormat, MediaFile};
pub use post::{
    DEFAULT_PAGE_LIMIT, ListPostsQuery, MAX_PAGE_LIMIT, Post, PostInput, PostPage, PostView,
};
pub use profile::{Contacts, Profile, ProfileInput};
pub use session::{OAuthAccount, OAuthUserInfo, Session};
pub use user::{Role, User, UserSummary};

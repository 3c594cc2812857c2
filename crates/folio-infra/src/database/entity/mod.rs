//! SeaORM entities, one module per table.

pub mod comment;
pub mod comment_like;
pub mod media_file;
pub mod oauth_account;
pub mod post;
pub mod post_like;
pub mod profile;
pub mod session;
pub mod user;

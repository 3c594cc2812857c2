//! Text helpers for post content.

pub mod readtime;
mod slug;

pub use slug::slugify;

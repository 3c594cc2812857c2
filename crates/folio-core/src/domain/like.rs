use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something a user can like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LikeTarget {
    Post(Uuid),
    Comment(Uuid),
}

impl LikeTarget {
    pub fn id(&self) -> Uuid {
        match self {
            LikeTarget::Post(id) | LikeTarget::Comment(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LikeTarget::Post(_) => "post",
            LikeTarget::Comment(_) => "comment",
        }
    }
}

/// Like state of a target for one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub is_liked: bool,
    pub likes_count: i64,
}

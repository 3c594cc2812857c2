use std::sync::Arc;

use super::post::is_visible;
use crate::domain::{LikeStatus, LikeTarget, User};
use crate::error::DomainError;
use crate::ports::{CommentRepository, LikeRepository, PostRepository};

pub struct LikeService {
    likes: Arc<dyn LikeRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl LikeService {
    pub fn new(
        likes: Arc<dyn LikeRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            likes,
            posts,
            comments,
        }
    }

    pub async fn toggle(&self, actor: &User, target: LikeTarget) -> Result<LikeStatus, DomainError> {
        self.ensure_target(target, Some(actor)).await?;

        let is_liked = self.likes.toggle(actor.id, target).await?;
        let likes_count = self.likes.count(target).await?;
        tracing::debug!(kind = target.kind(), target_id = %target.id(), is_liked, "Like toggled");

        Ok(LikeStatus {
            is_liked,
            likes_count,
        })
    }

    pub async fn status(
        &self,
        target: LikeTarget,
        viewer: Option<&User>,
    ) -> Result<LikeStatus, DomainError> {
        self.ensure_target(target, viewer).await?;

        let likes_count = self.likes.count(target).await?;
        let is_liked = match viewer {
            Some(user) => self.likes.liked_by(user.id, &[target]).await?.contains(&target),
            None => false,
        };
        Ok(LikeStatus {
            is_liked,
            likes_count,
        })
    }

    /// The target must exist and be visible to the viewer; deleted comments
    /// count as missing.
    async fn ensure_target(
        &self,
        target: LikeTarget,
        viewer: Option<&User>,
    ) -> Result<(), DomainError> {
        match target {
            LikeTarget::Post(id) => {
                self.posts
                    .find_by_id(id)
                    .await?
                    .filter(|post| is_visible(post, viewer))
                    .ok_or_else(|| DomainError::not_found("post", id))?;
            }
            LikeTarget::Comment(id) => {
                let comment = self
                    .comments
                    .find_by_id(id)
                    .await?
                    .filter(|comment| !comment.is_deleted())
                    .ok_or_else(|| DomainError::not_found("comment", id))?;
                // Comments under a hidden draft are hidden too.
                self.posts
                    .find_by_id(comment.post_id)
                    .await?
                    .filter(|post| is_visible(post, viewer))
                    .ok_or_else(|| DomainError::not_found("comment", id))?;
            }
        }
        Ok(())
    }
}

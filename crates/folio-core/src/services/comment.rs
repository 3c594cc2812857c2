//! Comment threads.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::PostService;
use crate::domain::{
    Comment, CommentInput, CommentNode, LikeTarget, MAX_REPLY_DEPTH, User, UserSummary,
    build_thread, reply_depth,
};
use crate::error::DomainError;
use crate::ports::{CommentRepository, LikeRepository, UserRepository};

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
    likes: Arc<dyn LikeRepository>,
    posts: Arc<PostService>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
        likes: Arc<dyn LikeRepository>,
        posts: Arc<PostService>,
    ) -> Self {
        Self {
            comments,
            users,
            likes,
            posts,
        }
    }

    /// The full reply tree of a post. Deleted comments stay in place so
    /// their replies keep their parent.
    pub async fn thread_for_post(
        &self,
        slug: &str,
        viewer: Option<&User>,
    ) -> Result<Vec<CommentNode>, DomainError> {
        let post = self.posts.find_visible_by_slug(slug, viewer).await?;
        let comments = self.comments.list_for_post(post.id).await?;
        let nodes = self.decorate(comments, viewer).await?;
        Ok(build_thread(nodes))
    }

    pub async fn create(
        &self,
        slug: &str,
        actor: &User,
        input: CommentInput,
    ) -> Result<CommentNode, DomainError> {
        let content = input.validated_content()?;
        let post = self.posts.find_visible_by_slug(slug, Some(actor)).await?;

        if let Some(parent_id) = input.parent_id {
            let parent = self.comments.find_by_id(parent_id).await?;
            match parent {
                Some(parent) if parent.post_id != post.id => {
                    return Err(DomainError::Validation(
                        "parent comment belongs to a different post".into(),
                    ));
                }
                Some(parent) if parent.is_deleted() => {
                    return Err(DomainError::Validation(
                        "cannot reply to a deleted comment".into(),
                    ));
                }
                Some(_) => {}
                None => {
                    return Err(DomainError::Validation(
                        "parent comment does not exist".into(),
                    ));
                }
            }

            let parents: HashMap<Uuid, Option<Uuid>> = self
                .comments
                .list_for_post(post.id)
                .await?
                .into_iter()
                .map(|c| (c.id, c.parent_id))
                .collect();
            if reply_depth(parent_id, &parents) > MAX_REPLY_DEPTH {
                return Err(DomainError::Validation(format!(
                    "replies cannot be nested more than {MAX_REPLY_DEPTH} levels deep"
                )));
            }
        }

        let comment = Comment::new(post.id, actor.id, input.parent_id, content);
        let comment = self.comments.insert(comment).await?;
        tracing::info!(comment_id = %comment.id, post_id = %post.id, reply = comment.parent_id.is_some(), "Comment created");

        Ok(CommentNode {
            author: Some(UserSummary::from(actor)),
            ..CommentNode::leaf(comment)
        })
    }

    /// Edit a comment. Only its author may, admins included.
    pub async fn update(
        &self,
        id: Uuid,
        actor: &User,
        input: CommentInput,
    ) -> Result<Comment, DomainError> {
        let mut comment = self.find(id).await?;
        if comment.user_id != actor.id {
            return Err(DomainError::Forbidden(
                "only the author can edit this comment".into(),
            ));
        }
        if comment.is_deleted() {
            return Err(DomainError::Conflict("comment has been deleted".into()));
        }

        comment.content = input.validated_content()?;
        comment.updated_at = Utc::now();
        Ok(self.comments.update(comment).await?)
    }

    /// Soft delete by the author or an admin.
    pub async fn delete(&self, id: Uuid, actor: &User) -> Result<(), DomainError> {
        let mut comment = self.find(id).await?;
        if !actor.can_manage(comment.user_id) {
            return Err(DomainError::Forbidden(
                "only the author or an admin can delete this comment".into(),
            ));
        }
        if comment.is_deleted() {
            return Err(DomainError::Conflict("comment is already deleted".into()));
        }

        let now = Utc::now();
        comment.deleted_at = Some(now);
        comment.updated_at = now;
        self.comments.update(comment).await?;
        tracing::info!(comment_id = %id, by_admin = actor.is_admin(), "Comment deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Comment, DomainError> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", id))
    }

    async fn decorate(
        &self,
        comments: Vec<Comment>,
        viewer: Option<&User>,
    ) -> Result<Vec<CommentNode>, DomainError> {
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let targets: Vec<LikeTarget> = comments.iter().map(|c| LikeTarget::Comment(c.id)).collect();
        let mut user_ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
        user_ids.sort();
        user_ids.dedup();

        let authors: HashMap<Uuid, UserSummary> = self
            .users
            .find_by_ids(&user_ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();
        let counts = self.likes.counts(&targets).await?;
        let liked = match viewer {
            Some(user) => self.likes.liked_by(user.id, &targets).await?,
            None => Default::default(),
        };

        Ok(comments
            .into_iter()
            .map(|comment| {
                let target = LikeTarget::Comment(comment.id);
                CommentNode {
                    author: authors.get(&comment.user_id).cloned(),
                    likes_count: counts.get(&target).copied().unwrap_or(0),
                    is_liked: liked.contains(&target),
                    ..CommentNode::leaf(comment)
                }
            })
            .collect())
    }
}

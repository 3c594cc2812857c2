//! Blog post use cases.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    LikeTarget, ListPostsQuery, Post, PostInput, PostPage, PostView, User, UserSummary,
};
use crate::error::DomainError;
use crate::ports::{LikeRepository, PostRepository, UserRepository};
use crate::text::{readtime, slugify};

/// Whether `viewer` may see `post`. Drafts are admin-only.
pub fn is_visible(post: &Post, viewer: Option<&User>) -> bool {
    post.published || viewer.is_some_and(User::is_admin)
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    likes: Arc<dyn LikeRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        likes: Arc<dyn LikeRepository>,
    ) -> Self {
        Self {
            posts,
            users,
            likes,
        }
    }

    pub async fn create(&self, author: &User, input: PostInput) -> Result<Post, DomainError> {
        input.validate()?;
        let slug = self.available_slug(&input.title, None).await?;

        let now = Utc::now();
        let mut post = Post {
            id: Uuid::new_v4(),
            author_id: author.id,
            title: input.title.trim().to_string(),
            slug,
            read_time_minutes: readtime::estimate_markdown(&input.content),
            cover_image: input.cover_image(),
            content: input.content,
            preview: input.preview,
            published: false,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        post.set_published(input.published, now);

        let post = self.posts.insert(post).await?;
        tracing::info!(post_id = %post.id, slug = %post.slug, published = post.published, "Post created");
        Ok(post)
    }

    pub async fn update(
        &self,
        id: Uuid,
        actor: &User,
        input: PostInput,
    ) -> Result<Post, DomainError> {
        let mut post = self.find(id).await?;
        if !actor.can_manage(post.author_id) {
            return Err(DomainError::Forbidden(
                "only the author or an admin can edit this post".into(),
            ));
        }
        input.validate()?;

        let now = Utc::now();
        post.slug = self.available_slug(&input.title, Some(post.id)).await?;
        post.title = input.title.trim().to_string();
        post.read_time_minutes = readtime::estimate_markdown(&input.content);
        post.cover_image = input.cover_image();
        post.content = input.content;
        post.preview = input.preview;
        post.set_published(input.published, now);
        post.updated_at = now;

        let post = self.posts.update(post).await?;
        tracing::info!(post_id = %post.id, slug = %post.slug, "Post updated");
        Ok(post)
    }

    pub async fn delete(&self, id: Uuid, actor: &User) -> Result<(), DomainError> {
        let post = self.find(id).await?;
        if !actor.can_manage(post.author_id) {
            return Err(DomainError::Forbidden(
                "only the author or an admin can delete this post".into(),
            ));
        }
        self.posts.delete(id).await?;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    pub async fn get_by_slug(
        &self,
        slug: &str,
        viewer: Option<&User>,
    ) -> Result<PostView, DomainError> {
        let post = self.find_visible_by_slug(slug, viewer).await?;
        let mut views = self.decorate(vec![post], viewer).await?;
        views
            .pop()
            .ok_or_else(|| DomainError::Internal("post view was not built".into()))
    }

    /// Paginated listing. Only admins can see drafts.
    pub async fn list(
        &self,
        query: ListPostsQuery,
        viewer: Option<&User>,
    ) -> Result<PostPage<PostView>, DomainError> {
        let mut query = query;
        if !viewer.is_some_and(User::is_admin) {
            query.published = Some(true);
        }

        let (posts, total) = self.posts.list(&query).await?;
        let views = self.decorate(posts, viewer).await?;
        Ok(PostPage::new(views, total, &query))
    }

    /// Lookup honouring draft visibility; hidden drafts read as missing.
    pub async fn find_visible_by_slug(
        &self,
        slug: &str,
        viewer: Option<&User>,
    ) -> Result<Post, DomainError> {
        self.posts
            .find_by_slug(slug)
            .await?
            .filter(|post| is_visible(post, viewer))
            .ok_or_else(|| DomainError::not_found("post", slug))
    }

    async fn find(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }

    async fn available_slug(
        &self,
        title: &str,
        current: Option<Uuid>,
    ) -> Result<String, DomainError> {
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(DomainError::Validation(
                "title must contain letters or digits usable in a URL".into(),
            ));
        }
        match self.posts.find_by_slug(&slug).await? {
            Some(existing) if Some(existing.id) != current => Err(DomainError::Conflict(format!(
                "a post with slug '{slug}' already exists"
            ))),
            _ => Ok(slug),
        }
    }

    async fn decorate(
        &self,
        posts: Vec<Post>,
        viewer: Option<&User>,
    ) -> Result<Vec<PostView>, DomainError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let targets: Vec<LikeTarget> = ids.iter().copied().map(LikeTarget::Post).collect();
        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<Uuid, UserSummary> = self
            .users
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();
        let like_counts = self.likes.counts(&targets).await?;
        let comment_counts = self.posts.comment_counts(&ids).await?;
        let liked = match viewer {
            Some(user) => self.likes.liked_by(user.id, &targets).await?,
            None => Default::default(),
        };

        Ok(posts
            .into_iter()
            .map(|post| {
                let target = LikeTarget::Post(post.id);
                PostView {
                    author: authors.get(&post.author_id).cloned(),
                    likes_count: like_counts.get(&target).copied().unwrap_or(0),
                    comments_count: comment_counts.get(&post.id).copied().unwrap_or(0),
                    is_liked: liked.contains(&target),
                    post,
                }
            })
            .collect())
    }
}

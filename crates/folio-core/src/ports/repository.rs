use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Comment, LikeTarget, ListPostsQuery, MediaFile, OAuthAccount, Post, Profile, Session, User,
};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity. Fails with `Constraint` on unique violations.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity. Fails with `NotFound` if it is missing.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Bulk lookup for author summaries. Missing ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;

    /// Insert a new user together with their first OAuth link. Either both
    /// rows are stored or neither is; a taken email fails with `Constraint`.
    async fn register(&self, user: User, account: OAuthAccount) -> Result<User, RepoError>;
}

/// Links between users and their OAuth identities.
#[async_trait]
pub trait OAuthAccountRepository: Send + Sync {
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthAccount>, RepoError>;

    /// Insert, or refresh the tokens of the existing link for the same
    /// provider identity.
    async fn upsert(&self, account: OAuthAccount) -> Result<OAuthAccount, RepoError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: Session) -> Result<Session, RepoError>;

    /// Session for `token` that has not expired at `now`.
    async fn find_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepoError>;

    async fn delete(&self, token: &str) -> Result<(), RepoError>;

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, RepoError>;

    /// Remove sessions expired at `now`, returning how many were removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// One page of posts, newest publication first, with the total match count.
    async fn list(&self, query: &ListPostsQuery) -> Result<(Vec<Post>, u64), RepoError>;

    /// Number of comments (deleted ones excluded) per post.
    async fn comment_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Every comment of a post, deleted ones included, oldest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;
}

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Flip the like of `user_id` on `target`. Returns whether it is now liked.
    async fn toggle(&self, user_id: Uuid, target: LikeTarget) -> Result<bool, RepoError>;

    async fn count(&self, target: LikeTarget) -> Result<i64, RepoError>;

    async fn counts(&self, targets: &[LikeTarget]) -> Result<HashMap<LikeTarget, i64>, RepoError>;

    /// Subset of `targets` liked by `user_id`.
    async fn liked_by(
        &self,
        user_id: Uuid,
        targets: &[LikeTarget],
    ) -> Result<HashSet<LikeTarget>, RepoError>;
}

/// Storage of the single site profile.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self) -> Result<Option<Profile>, RepoError>;

    async fn upsert(&self, profile: Profile) -> Result<Profile, RepoError>;
}

#[async_trait]
pub trait MediaRepository: BaseRepository<MediaFile, Uuid> {
    /// Uploads of one user, newest first.
    async fn list_by_uploader(&self, uploader_id: Uuid) -> Result<Vec<MediaFile>, RepoError>;
}

//! In-memory repositories - used when no database is configured, and by tests.
//!
//! Note: Data is lost on process restart.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use folio_core::domain::{
    Comment, LikeTarget, ListPostsQuery, MediaFile, OAuthAccount, Post, Profile, Session, User,
};
use folio_core::error::RepoError;
use folio_core::ports::{
    BaseRepository, CommentRepository, LikeRepository, MediaRepository, OAuthAccountRepository,
    PostRepository, ProfileRepository, SessionRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    accounts: HashMap<(String, String), OAuthAccount>,
    sessions: HashMap<String, Session>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    likes: HashSet<(Uuid, LikeTarget)>,
    profile: Option<Profile>,
    media: HashMap<Uuid, MediaFile>,
}

/// All repositories over a single set of tables behind one async lock.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl Tables {
    /// Insert or refresh the link for a provider identity.
    fn link(&mut self, account: OAuthAccount) -> OAuthAccount {
        let key = (account.provider.clone(), account.provider_user_id.clone());
        let stored = match self.accounts.remove(&key) {
            Some(existing) => OAuthAccount {
                id: existing.id,
                created_at: existing.created_at,
                ..account
            },
            None => account,
        };
        self.accounts.insert(key, stored.clone());
        stored
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Constraint("users_email_key".into()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.users.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)?;
        tables.sessions.retain(|_, s| s.user_id != id);
        tables.accounts.retain(|_, a| a.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn register(&self, user: User, account: OAuthAccount) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Constraint("users_email_key".into()));
        }
        tables.users.insert(user.id, user.clone());
        tables.link(account);
        Ok(user)
    }
}

#[async_trait]
impl OAuthAccountRepository for InMemoryStore {
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthAccount>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .get(&(provider.to_string(), provider_user_id.to_string()))
            .cloned())
    }

    async fn upsert(&self, account: OAuthAccount) -> Result<OAuthAccount, RepoError> {
        Ok(self.tables.write().await.link(account))
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn insert(&self, session: Session) -> Result<Session, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.token) {
            return Err(RepoError::Constraint("sessions_token_key".into()));
        }
        tables.sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn find_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(token)
            .filter(|s| !s.is_expired(now))
            .cloned())
    }

    async fn delete(&self, token: &str) -> Result<(), RepoError> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.posts.values().any(|p| p.slug == post.slug) {
            return Err(RepoError::Constraint("posts_slug_key".into()));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .posts
            .values()
            .any(|p| p.slug == post.slug && p.id != post.id)
        {
            return Err(RepoError::Constraint("posts_slug_key".into()));
        }
        match tables.posts.get_mut(&post.id) {
            Some(slot) => {
                *slot = post.clone();
                Ok(post)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.posts.remove(&id).ok_or(RepoError::NotFound)?;

        let removed: HashSet<Uuid> = tables
            .comments
            .values()
            .filter(|c| c.post_id == id)
            .map(|c| c.id)
            .collect();
        tables.comments.retain(|_, c| c.post_id != id);
        tables.likes.retain(|(_, target)| match target {
            LikeTarget::Post(post_id) => *post_id != id,
            LikeTarget::Comment(comment_id) => !removed.contains(comment_id),
        });
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.values().find(|p| p.slug == slug).cloned())
    }

    async fn list(&self, query: &ListPostsQuery) -> Result<(Vec<Post>, u64), RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| query.published.is_none_or(|published| p.published == published))
            .cloned()
            .collect();

        // published_at DESC NULLS LAST, then created_at DESC
        posts.sort_by(|a, b| match (a.published_at, b.published_at) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| b.created_at.cmp(&a.created_at)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.created_at.cmp(&a.created_at),
        });

        let total = posts.len() as u64;
        let page = posts
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn comment_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, RepoError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.values() {
            if !comment.is_deleted() && post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn insert(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint("comments_post_id_fkey".into()));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.comments.get_mut(&comment.id) {
            Some(slot) => {
                *slot = comment.clone();
                Ok(comment)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.comments.remove(&id).ok_or(RepoError::NotFound)?;
        tables
            .likes
            .retain(|(_, target)| *target != LikeTarget::Comment(id));
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }
}

#[async_trait]
impl LikeRepository for InMemoryStore {
    async fn toggle(&self, user_id: Uuid, target: LikeTarget) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let key = (user_id, target);
        if tables.likes.remove(&key) {
            Ok(false)
        } else {
            tables.likes.insert(key);
            Ok(true)
        }
    }

    async fn count(&self, target: LikeTarget) -> Result<i64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.likes.iter().filter(|(_, t)| *t == target).count() as i64)
    }

    async fn counts(&self, targets: &[LikeTarget]) -> Result<HashMap<LikeTarget, i64>, RepoError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for (_, target) in tables.likes.iter() {
            if targets.contains(target) {
                *counts.entry(*target).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn liked_by(
        &self,
        user_id: Uuid,
        targets: &[LikeTarget],
    ) -> Result<HashSet<LikeTarget>, RepoError> {
        let tables = self.tables.read().await;
        Ok(targets
            .iter()
            .filter(|t| tables.likes.contains(&(user_id, **t)))
            .copied()
            .collect())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn get(&self) -> Result<Option<Profile>, RepoError> {
        Ok(self.tables.read().await.profile.clone())
    }

    async fn upsert(&self, profile: Profile) -> Result<Profile, RepoError> {
        self.tables.write().await.profile = Some(profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl BaseRepository<MediaFile, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaFile>, RepoError> {
        Ok(self.tables.read().await.media.get(&id).cloned())
    }

    async fn insert(&self, file: MediaFile) -> Result<MediaFile, RepoError> {
        self.tables.write().await.media.insert(file.id, file.clone());
        Ok(file)
    }

    async fn update(&self, file: MediaFile) -> Result<MediaFile, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.media.get_mut(&file.id) {
            Some(slot) => {
                *slot = file.clone();
                Ok(file)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.tables
            .write()
            .await
            .media
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl MediaRepository for InMemoryStore {
    async fn list_by_uploader(&self, uploader_id: Uuid) -> Result<Vec<MediaFile>, RepoError> {
        let tables = self.tables.read().await;
        let mut files: Vec<MediaFile> = tables
            .media
            .values()
            .filter(|m| m.uploader_id == uploader_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }
}

//! PostgreSQL repository implementations.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, NullOrdering, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use folio_core::domain::{
    Comment, LikeTarget, ListPostsQuery, MediaFile, OAuthAccount, Post, Profile, Session, User,
};
use folio_core::error::RepoError;
use folio_core::ports::{
    CommentRepository, LikeRepository, MediaRepository, OAuthAccountRepository, PostRepository,
    ProfileRepository, SessionRepository, UserRepository,
};

use super::entity::{
    comment, comment_like, media_file, oauth_account, post, post_like, profile, session, user,
};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<user::Entity>;

/// PostgreSQL OAuth account repository.
pub type PostgresOAuthAccountRepository = PostgresBaseRepository<oauth_account::Entity>;

/// PostgreSQL session repository.
pub type PostgresSessionRepository = PostgresBaseRepository<session::Entity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<post::Entity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<comment::Entity>;

/// PostgreSQL profile repository.
pub type PostgresProfileRepository = PostgresBaseRepository<profile::Entity>;

/// PostgreSQL media repository.
pub type PostgresMediaRepository = PostgresBaseRepository<media_file::Entity>;

/// Likes live in two tables; the repository is keyed on the post side.
pub type PostgresLikeRepository = PostgresBaseRepository<post_like::Entity>;

/// Mask an email for logging to avoid PII in logs.
pub(crate) fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            if local.chars().count() > 1 {
                format!("{first}***@{domain}")
            } else {
                format!("***@{domain}")
            }
        }
        None => "***".to_string(),
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    id: Uuid,
    count: i64,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn register(&self, new_user: User, account: OAuthAccount) -> Result<User, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let active_model: user::ActiveModel = new_user.into();
        let model = active_model.insert(&txn).await.map_err(map_db_err)?;
        link_in(&txn, account).await?;

        txn.commit().await.map_err(map_db_err)?;
        tracing::debug!(user_id = %model.id, "User registered with OAuth link");
        Ok(model.into())
    }
}

async fn link_in<C: ConnectionTrait>(conn: &C, account: OAuthAccount) -> Result<(), RepoError> {
    upsert_account(account)
        .exec_without_returning(conn)
        .await
        .map_err(map_db_err)?;
    Ok(())
}

#[async_trait]
impl OAuthAccountRepository for PostgresOAuthAccountRepository {
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthAccount>, RepoError> {
        let result = oauth_account::Entity::find()
            .filter(oauth_account::Column::Provider.eq(provider))
            .filter(oauth_account::Column::ProviderUserId.eq(provider_user_id))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn upsert(&self, account: OAuthAccount) -> Result<OAuthAccount, RepoError> {
        let model = upsert_account(account)
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }
}

/// Insert keyed on `(provider, provider_user_id)`, refreshing tokens and
/// owner when the identity is already linked.
fn upsert_account(account: OAuthAccount) -> sea_orm::Insert<oauth_account::ActiveModel> {
    let active_model: oauth_account::ActiveModel = account.into();
    oauth_account::Entity::insert(active_model).on_conflict(
        OnConflict::columns([
            oauth_account::Column::Provider,
            oauth_account::Column::ProviderUserId,
        ])
        .update_columns([
            oauth_account::Column::UserId,
            oauth_account::Column::AccessToken,
            oauth_account::Column::RefreshToken,
            oauth_account::Column::ExpiresAt,
            oauth_account::Column::UpdatedAt,
        ])
        .to_owned(),
    )
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn insert(&self, session: Session) -> Result<Session, RepoError> {
        let active_model: session::ActiveModel = session.into();
        let model = active_model.insert(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn find_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepoError> {
        let result = session::Entity::find()
            .filter(session::Column::Token.eq(token))
            .filter(session::Column::ExpiresAt.gt(now))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn delete(&self, token: &str) -> Result<(), RepoError> {
        session::Entity::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(now))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let result = post::Entity::find()
            .filter(post::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn list(&self, query: &ListPostsQuery) -> Result<(Vec<Post>, u64), RepoError> {
        let mut select = post::Entity::find();
        if let Some(published) = query.published {
            select = select.filter(post::Column::Published.eq(published));
        }

        let total = select.clone().count(self.db.as_ref()).await.map_err(map_db_err)?;
        let posts = select
            .order_by_with_nulls(post::Column::PublishedAt, Order::Desc, NullOrdering::Last)
            .order_by_desc(post::Column::CreatedAt)
            .offset(query.offset())
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok((posts.into_iter().map(Into::into).collect(), total))
    }

    async fn comment_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = comment::Entity::find()
            .select_only()
            .column_as(comment::Column::PostId, "id")
            .column_as(Expr::col(comment::Column::Id).count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids.to_vec()))
            .filter(comment::Column::DeletedAt.is_null())
            .group_by(comment::Column::PostId)
            .into_model::<CountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(|r| (r.id, r.count)).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let result = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

fn split_targets(targets: &[LikeTarget]) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut posts = Vec::new();
    let mut comments = Vec::new();
    for target in targets {
        match target {
            LikeTarget::Post(id) => posts.push(*id),
            LikeTarget::Comment(id) => comments.push(*id),
        }
    }
    (posts, comments)
}

impl PostgresLikeRepository {
    async fn post_like_counts(&self, ids: Vec<Uuid>) -> Result<Vec<CountRow>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        post_like::Entity::find()
            .select_only()
            .column_as(post_like::Column::PostId, "id")
            .column_as(Expr::col(post_like::Column::UserId).count(), "count")
            .filter(post_like::Column::PostId.is_in(ids))
            .group_by(post_like::Column::PostId)
            .into_model::<CountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    async fn comment_like_counts(&self, ids: Vec<Uuid>) -> Result<Vec<CountRow>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        comment_like::Entity::find()
            .select_only()
            .column_as(comment_like::Column::CommentId, "id")
            .column_as(Expr::col(comment_like::Column::UserId).count(), "count")
            .filter(comment_like::Column::CommentId.is_in(ids))
            .group_by(comment_like::Column::CommentId)
            .into_model::<CountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn toggle(&self, user_id: Uuid, target: LikeTarget) -> Result<bool, RepoError> {
        let now = Utc::now();
        let removed = match target {
            LikeTarget::Post(post_id) => post_like::Entity::delete_many()
                .filter(post_like::Column::UserId.eq(user_id))
                .filter(post_like::Column::PostId.eq(post_id))
                .exec(self.db.as_ref())
                .await
                .map_err(map_db_err)?
                .rows_affected,
            LikeTarget::Comment(comment_id) => comment_like::Entity::delete_many()
                .filter(comment_like::Column::UserId.eq(user_id))
                .filter(comment_like::Column::CommentId.eq(comment_id))
                .exec(self.db.as_ref())
                .await
                .map_err(map_db_err)?
                .rows_affected,
        };
        if removed > 0 {
            return Ok(false);
        }

        match target {
            LikeTarget::Post(post_id) => {
                post_like::Entity::insert(post_like::ActiveModel {
                    user_id: Set(user_id),
                    post_id: Set(post_id),
                    created_at: Set(now.into()),
                })
                .on_conflict(
                    OnConflict::columns([post_like::Column::UserId, post_like::Column::PostId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await
                .map_err(map_db_err)?;
            }
            LikeTarget::Comment(comment_id) => {
                comment_like::Entity::insert(comment_like::ActiveModel {
                    user_id: Set(user_id),
                    comment_id: Set(comment_id),
                    created_at: Set(now.into()),
                })
                .on_conflict(
                    OnConflict::columns([
                        comment_like::Column::UserId,
                        comment_like::Column::CommentId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await
                .map_err(map_db_err)?;
            }
        }
        Ok(true)
    }

    async fn count(&self, target: LikeTarget) -> Result<i64, RepoError> {
        let count = match target {
            LikeTarget::Post(id) => post_like::Entity::find()
                .filter(post_like::Column::PostId.eq(id))
                .count(self.db.as_ref())
                .await,
            LikeTarget::Comment(id) => comment_like::Entity::find()
                .filter(comment_like::Column::CommentId.eq(id))
                .count(self.db.as_ref())
                .await,
        }
        .map_err(map_db_err)?;
        Ok(count as i64)
    }

    async fn counts(&self, targets: &[LikeTarget]) -> Result<HashMap<LikeTarget, i64>, RepoError> {
        let (post_ids, comment_ids) = split_targets(targets);
        let mut counts = HashMap::new();
        for row in self.post_like_counts(post_ids).await? {
            counts.insert(LikeTarget::Post(row.id), row.count);
        }
        for row in self.comment_like_counts(comment_ids).await? {
            counts.insert(LikeTarget::Comment(row.id), row.count);
        }
        Ok(counts)
    }

    async fn liked_by(
        &self,
        user_id: Uuid,
        targets: &[LikeTarget],
    ) -> Result<HashSet<LikeTarget>, RepoError> {
        let (post_ids, comment_ids) = split_targets(targets);
        let mut liked = HashSet::new();

        if !post_ids.is_empty() {
            let rows = post_like::Entity::find()
                .filter(post_like::Column::UserId.eq(user_id))
                .filter(post_like::Column::PostId.is_in(post_ids))
                .all(self.db.as_ref())
                .await
                .map_err(map_db_err)?;
            liked.extend(rows.into_iter().map(|r| LikeTarget::Post(r.post_id)));
        }
        if !comment_ids.is_empty() {
            let rows = comment_like::Entity::find()
                .filter(comment_like::Column::UserId.eq(user_id))
                .filter(comment_like::Column::CommentId.is_in(comment_ids))
                .all(self.db.as_ref())
                .await
                .map_err(map_db_err)?;
            liked.extend(rows.into_iter().map(|r| LikeTarget::Comment(r.comment_id)));
        }
        Ok(liked)
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn get(&self) -> Result<Option<Profile>, RepoError> {
        let result = profile::Entity::find()
            .order_by_asc(profile::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn upsert(&self, profile: Profile) -> Result<Profile, RepoError> {
        let active_model: profile::ActiveModel = profile.into();
        let model = profile::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(profile::Column::Id)
                    .update_columns([
                        profile::Column::Name,
                        profile::Column::Description,
                        profile::Column::PhotoUrl,
                        profile::Column::Activity,
                        profile::Column::ContactEmail,
                        profile::Column::ContactGithub,
                        profile::Column::ContactLinkedin,
                        profile::Column::ContactVk,
                        profile::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(model.into())
    }
}

#[async_trait]
impl MediaRepository for PostgresMediaRepository {
    async fn list_by_uploader(&self, uploader_id: Uuid) -> Result<Vec<MediaFile>, RepoError> {
        let result = media_file::Entity::find()
            .filter(media_file::Column::UploaderId.eq(uploader_id))
            .order_by_desc(media_file::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::mask_email;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("jane@example.com"), "j***@example.com");
        assert_eq!(mask_email("j@example.com"), "***@example.com");
        assert_eq!(mask_email("nonsense"), "***");
    }
}

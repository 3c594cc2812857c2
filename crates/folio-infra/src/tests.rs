//! Service flows against the in-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use folio_core::domain::{
    CommentInput, LikeTarget, ListPostsQuery, MAX_REPLY_DEPTH, OAuthAccount, OAuthUserInfo, Post,
    PostInput, Role, User,
};
use folio_core::error::RepoError;
use folio_core::ports::{
    BaseRepository, OAuthAccountRepository, SessionTokenGenerator, UserRepository,
};
use folio_core::services::{AuthService, CommentService, LikeService, MediaService, PostService};
use folio_core::DomainError;

use crate::{InMemoryStore, LocalMediaStorage};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrest-of-image";

#[derive(Default)]
struct SeqTokens(AtomicU64);

impl SessionTokenGenerator for SeqTokens {
    fn generate(&self) -> String {
        format!("token-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

struct Fixture {
    store: Arc<InMemoryStore>,
    posts: Arc<PostService>,
    comments: CommentService,
    likes: LikeService,
    admin: User,
    reader: User,
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let posts = Arc::new(PostService::new(store.clone(), store.clone(), store.clone()));
    let comments = CommentService::new(store.clone(), store.clone(), store.clone(), posts.clone());
    let likes = LikeService::new(store.clone(), store.clone(), store.clone());

    let admin = User::new("admin@example.com".into(), "Admin".into(), None, Role::Admin);
    let reader = User::new("reader@example.com".into(), "Reader".into(), None, Role::User);
    BaseRepository::<User, Uuid>::insert(store.as_ref(), admin.clone()).await.unwrap();
    BaseRepository::<User, Uuid>::insert(store.as_ref(), reader.clone()).await.unwrap();

    Fixture {
        store,
        posts,
        comments,
        likes,
        admin,
        reader,
    }
}

fn post_input(title: &str, published: bool) -> PostInput {
    PostInput {
        title: title.into(),
        content: "Some markdown content for the post body.".into(),
        preview: "Preview".into(),
        published,
        cover_image: None,
    }
}

fn comment(content: &str, parent_id: Option<Uuid>) -> CommentInput {
    CommentInput {
        content: content.into(),
        parent_id,
    }
}

#[tokio::test]
async fn test_drafts_are_hidden_from_readers() {
    let f = fixture().await;
    let published = f.posts.create(&f.admin, post_input("Hello World", true)).await.unwrap();
    let draft = f.posts.create(&f.admin, post_input("Work In Progress", false)).await.unwrap();

    assert_eq!(published.slug, "hello-world");
    assert!(published.published_at.is_some());
    assert!(draft.published_at.is_none());

    let page = f
        .posts
        .list(ListPostsQuery::new(None, None, Some(false)), None)
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.posts[0].post.slug, "hello-world");

    let admin_page = f
        .posts
        .list(ListPostsQuery::new(None, None, None), Some(&f.admin))
        .await
        .unwrap();
    assert_eq!(admin_page.total_count, 2);

    let hidden = f.posts.get_by_slug(&draft.slug, Some(&f.reader)).await;
    assert!(matches!(hidden, Err(DomainError::NotFound { .. })));
    assert!(f.posts.get_by_slug(&draft.slug, Some(&f.admin)).await.is_ok());
}

#[tokio::test]
async fn test_duplicate_slug_is_a_conflict() {
    let f = fixture().await;
    f.posts.create(&f.admin, post_input("Same Title", true)).await.unwrap();

    let result = f.posts.create(&f.admin, post_input("Same title!", true)).await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn test_readers_cannot_edit_posts() {
    let f = fixture().await;
    let post = f.posts.create(&f.admin, post_input("Admin Post", true)).await.unwrap();

    let result = f.posts.update(post.id, &f.reader, post_input("Hijacked", true)).await;
    assert!(matches!(result, Err(DomainError::Forbidden(_))));

    let updated = f
        .posts
        .update(post.id, &f.admin, post_input("Admin Post Renamed", true))
        .await
        .unwrap();
    assert_eq!(updated.slug, "admin-post-renamed");
    assert_eq!(updated.published_at, post.published_at);
}

fn stored_post(slug: &str, published_at: Option<i64>, created_at: i64) -> Post {
    let at = |secs| DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs);
    Post {
        id: Uuid::new_v4(),
        author_id: Uuid::new_v4(),
        title: slug.into(),
        slug: slug.into(),
        content: "content".into(),
        preview: String::new(),
        cover_image: None,
        published: published_at.is_some(),
        published_at: published_at.map(at),
        read_time_minutes: 1,
        created_at: at(created_at),
        updated_at: at(created_at),
    }
}

#[tokio::test]
async fn test_listing_orders_by_publication_then_creation() {
    let f = fixture().await;
    let posts = [
        stored_post("old-draft", None, 10),
        stored_post("published-early", Some(100), 1),
        stored_post("new-draft", None, 500),
        stored_post("published-late", Some(300), 2),
        stored_post("republished", Some(300), 5),
    ];
    for post in posts {
        BaseRepository::<Post, Uuid>::insert(f.store.as_ref(), post).await.unwrap();
    }

    let all = f.posts.list(ListPostsQuery::default(), Some(&f.admin)).await.unwrap();
    let slugs: Vec<&str> = all.posts.iter().map(|v| v.post.slug.as_str()).collect();
    assert_eq!(
        slugs,
        ["republished", "published-late", "published-early", "new-draft", "old-draft"]
    );

    let visible = f.posts.list(ListPostsQuery::default(), Some(&f.reader)).await.unwrap();
    assert_eq!(visible.total_count, 3);
    assert_eq!(visible.posts[0].post.slug, "republished");
}

#[tokio::test]
async fn test_comment_thread_nests_replies() {
    let f = fixture().await;
    let post = f.posts.create(&f.admin, post_input("Threaded", true)).await.unwrap();

    let root = f.comments.create(&post.slug, &f.reader, comment("root", None)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let reply = f
        .comments
        .create(&post.slug, &f.admin, comment("reply", Some(root.comment.id)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    f.comments
        .create(&post.slug, &f.reader, comment("nested", Some(reply.comment.id)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    f.comments.create(&post.slug, &f.admin, comment("second root", None)).await.unwrap();

    let thread = f.comments.thread_for_post(&post.slug, None).await.unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].comment.content, "root");
    assert_eq!(thread[0].len(), 3);
    assert_eq!(thread[0].replies[0].replies[0].comment.content, "nested");
    assert_eq!(thread[0].author.as_ref().map(|a| a.name.as_str()), Some("Reader"));

    let view = f.posts.get_by_slug(&post.slug, None).await.unwrap();
    assert_eq!(view.comments_count, 4);
}

#[tokio::test]
async fn test_reply_must_target_same_post_and_live_parent() {
    let f = fixture().await;
    let first = f.posts.create(&f.admin, post_input("First", true)).await.unwrap();
    let second = f.posts.create(&f.admin, post_input("Second", true)).await.unwrap();

    let parent = f.comments.create(&first.slug, &f.reader, comment("hi", None)).await.unwrap();

    let cross_post = f
        .comments
        .create(&second.slug, &f.reader, comment("wrong", Some(parent.comment.id)))
        .await;
    assert!(matches!(cross_post, Err(DomainError::Validation(_))));

    f.comments.delete(parent.comment.id, &f.reader).await.unwrap();
    let to_deleted = f
        .comments
        .create(&first.slug, &f.reader, comment("late", Some(parent.comment.id)))
        .await;
    assert!(matches!(to_deleted, Err(DomainError::Validation(_))));

    let missing = f
        .comments
        .create(&first.slug, &f.reader, comment("ghost", Some(Uuid::new_v4())))
        .await;
    assert!(matches!(missing, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_replies_stop_at_max_depth() {
    let f = fixture().await;
    let post = f.posts.create(&f.admin, post_input("Deep", true)).await.unwrap();

    let mut parent = f.comments.create(&post.slug, &f.reader, comment("top", None)).await.unwrap();
    for depth in 1..=MAX_REPLY_DEPTH {
        parent = f
            .comments
            .create(&post.slug, &f.reader, comment(&format!("level {depth}"), Some(parent.comment.id)))
            .await
            .unwrap();
    }

    let too_deep = f
        .comments
        .create(&post.slug, &f.reader, comment("one more", Some(parent.comment.id)))
        .await;
    assert!(matches!(too_deep, Err(DomainError::Validation(_))));

    let thread = f.comments.thread_for_post(&post.slug, Some(&f.reader)).await.unwrap();
    assert_eq!(thread[0].len(), MAX_REPLY_DEPTH + 1);
}

#[tokio::test]
async fn test_comment_edit_and_soft_delete_rules() {
    let f = fixture().await;
    let post = f.posts.create(&f.admin, post_input("Rules", true)).await.unwrap();
    let node = f.comments.create(&post.slug, &f.reader, comment("mine", None)).await.unwrap();
    let id = node.comment.id;

    let by_admin = f.comments.update(id, &f.admin, comment("edited", None)).await;
    assert!(matches!(by_admin, Err(DomainError::Forbidden(_))));

    let edited = f.comments.update(id, &f.reader, comment("  edited  ", None)).await.unwrap();
    assert_eq!(edited.content, "edited");

    f.comments.delete(id, &f.admin).await.unwrap();
    let again = f.comments.delete(id, &f.reader).await;
    assert!(matches!(again, Err(DomainError::Conflict(_))));

    let thread = f.comments.thread_for_post(&post.slug, None).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert!(thread[0].comment.is_deleted());
}

#[tokio::test]
async fn test_like_toggle_and_status() {
    let f = fixture().await;
    let post = f.posts.create(&f.admin, post_input("Likeable", true)).await.unwrap();
    let target = LikeTarget::Post(post.id);

    let liked = f.likes.toggle(&f.reader, target).await.unwrap();
    assert!(liked.is_liked);
    assert_eq!(liked.likes_count, 1);

    let anonymous = f.likes.status(target, None).await.unwrap();
    assert!(!anonymous.is_liked);
    assert_eq!(anonymous.likes_count, 1);

    let unliked = f.likes.toggle(&f.reader, target).await.unwrap();
    assert!(!unliked.is_liked);
    assert_eq!(unliked.likes_count, 0);
}

#[tokio::test]
async fn test_cannot_like_hidden_or_deleted_targets() {
    let f = fixture().await;
    let draft = f.posts.create(&f.admin, post_input("Secret", false)).await.unwrap();
    let result = f.likes.toggle(&f.reader, LikeTarget::Post(draft.id)).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));

    let post = f.posts.create(&f.admin, post_input("Public", true)).await.unwrap();
    let node = f.comments.create(&post.slug, &f.reader, comment("bye", None)).await.unwrap();
    f.comments.delete(node.comment.id, &f.reader).await.unwrap();

    let result = f.likes.toggle(&f.admin, LikeTarget::Comment(node.comment.id)).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
}

#[tokio::test]
async fn test_comments_on_drafts_cannot_be_liked_by_readers() {
    let f = fixture().await;
    let draft = f.posts.create(&f.admin, post_input("Work in progress", false)).await.unwrap();
    let note = f.comments.create(&draft.slug, &f.admin, comment("note to self", None)).await.unwrap();
    let target = LikeTarget::Comment(note.comment.id);

    let result = f.likes.toggle(&f.reader, target).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));
    let result = f.likes.status(target, None).await;
    assert!(matches!(result, Err(DomainError::NotFound { .. })));

    assert!(f.likes.toggle(&f.admin, target).await.unwrap().is_liked);
}

#[tokio::test]
async fn test_deleting_a_post_removes_its_comments() {
    let f = fixture().await;
    let post = f.posts.create(&f.admin, post_input("Doomed", true)).await.unwrap();
    let node = f.comments.create(&post.slug, &f.reader, comment("first", None)).await.unwrap();

    f.posts.delete(post.id, &f.admin).await.unwrap();

    let found = BaseRepository::<folio_core::domain::Comment, Uuid>::find_by_id(
        f.store.as_ref(),
        node.comment.id,
    )
    .await
    .unwrap();
    assert!(found.is_none());
}

fn auth_service(store: &Arc<InMemoryStore>, ttl: TimeDelta) -> AuthService {
    AuthService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(SeqTokens::default()),
        ttl,
        vec!["Owner@Example.com".to_string()],
    )
}

fn identity(provider: &str, id: &str, email: Option<&str>) -> OAuthUserInfo {
    OAuthUserInfo {
        provider: provider.into(),
        provider_user_id: id.into(),
        email: email.map(Into::into),
        name: Some("Someone".into()),
        access_token: "provider-token".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_login_creates_then_reuses_user() {
    let store = Arc::new(InMemoryStore::new());
    let auth = auth_service(&store, TimeDelta::hours(1));

    let (user, session) = auth
        .login_with_oauth(identity("github", "1", Some("dev@example.com")))
        .await
        .unwrap();
    assert_eq!(user.role, Role::User);

    // Same email through another provider links to the same user.
    let (again, _) = auth
        .login_with_oauth(identity("google", "g-1", Some("DEV@example.com")))
        .await
        .unwrap();
    assert_eq!(again.id, user.id);

    let current = auth.validate_session(&session.token).await.unwrap();
    assert_eq!(current.map(|u| u.id), Some(user.id));

    auth.logout(&session.token).await.unwrap();
    assert!(auth.validate_session(&session.token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_admin_emails_are_promoted() {
    let store = Arc::new(InMemoryStore::new());
    let auth = auth_service(&store, TimeDelta::hours(1));

    let (user, _) = auth
        .login_with_oauth(identity("google", "42", Some("owner@example.com")))
        .await
        .unwrap();
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn test_signup_requires_an_email() {
    let store = Arc::new(InMemoryStore::new());
    let auth = auth_service(&store, TimeDelta::hours(1));

    let result = auth.login_with_oauth(identity("vk", "7", None)).await;
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

/// Loses every registration to a concurrent sign-up with the same email.
struct LosingRegistrations {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl BaseRepository<User, Uuid> for LosingRegistrations {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        BaseRepository::<User, Uuid>::find_by_id(self.store.as_ref(), id).await
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        BaseRepository::<User, Uuid>::insert(self.store.as_ref(), user).await
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        BaseRepository::<User, Uuid>::update(self.store.as_ref(), user).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        BaseRepository::<User, Uuid>::delete(self.store.as_ref(), id).await
    }
}

#[async_trait]
impl UserRepository for LosingRegistrations {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.store.find_by_email(email).await
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        self.store.find_by_ids(ids).await
    }

    async fn register(&self, user: User, _account: OAuthAccount) -> Result<User, RepoError> {
        let winner = User::new(user.email, "First In".into(), None, Role::User);
        BaseRepository::<User, Uuid>::insert(self.store.as_ref(), winner).await?;
        Err(RepoError::Constraint("users_email_key".into()))
    }
}

#[tokio::test]
async fn test_signup_race_reuses_the_winning_user() {
    let store = Arc::new(InMemoryStore::new());
    let auth = AuthService::new(
        Arc::new(LosingRegistrations {
            store: store.clone(),
        }),
        store.clone(),
        store.clone(),
        Arc::new(SeqTokens::default()),
        TimeDelta::hours(1),
        Vec::new(),
    );

    let (user, session) = auth
        .login_with_oauth(identity("github", "5", Some("racer@example.com")))
        .await
        .unwrap();
    assert_eq!(user.name, "First In");
    assert_eq!(session.user_id, user.id);

    let link = store.find_by_provider("github", "5").await.unwrap().unwrap();
    assert_eq!(link.user_id, user.id);
}

#[tokio::test]
async fn test_failed_registration_stores_nothing() {
    let store = InMemoryStore::new();
    let info = identity("github", "11", Some("taken@example.com"));
    let first = User::new("taken@example.com".into(), "First".into(), None, Role::User);
    store.register(first.clone(), OAuthAccount::link(first.id, &info)).await.unwrap();

    let second = User::new("taken@example.com".into(), "Second".into(), None, Role::User);
    let other = identity("google", "22", Some("taken@example.com"));
    let result = store.register(second.clone(), OAuthAccount::link(second.id, &other)).await;

    assert!(matches!(result, Err(RepoError::Constraint(_))));
    assert!(store.find_by_provider("google", "22").await.unwrap().is_none());
    assert!(
        BaseRepository::<User, Uuid>::find_by_id(&store, second.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_expired_sessions_are_ignored_and_cleaned() {
    let store = Arc::new(InMemoryStore::new());
    let auth = auth_service(&store, TimeDelta::seconds(-1));

    let (_, session) = auth
        .login_with_oauth(identity("github", "9", Some("late@example.com")))
        .await
        .unwrap();

    assert!(auth.validate_session(&session.token).await.unwrap().is_none());
    assert_eq!(auth.cleanup_expired().await.unwrap(), 1);
}

#[tokio::test]
async fn test_media_upload_read_delete() {
    let f = fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalMediaStorage::new(dir.path()).await.unwrap());
    let media = MediaService::new(f.store.clone(), storage, "http://localhost:8080/", 1024);

    let file = media.upload(&f.admin, "photo.PNG", PNG).await.unwrap();
    assert!(file.filename.ends_with(".png"));
    assert_eq!(file.mime_type, "image/png");
    assert_eq!(
        media.public_url(&file),
        format!("http://localhost:8080/media/{}", file.filename)
    );

    let (bytes, mime) = media.read(&file.filename).await.unwrap();
    assert_eq!(bytes, PNG);
    assert_eq!(mime, "image/png");

    let forbidden = media.delete(file.id, &f.reader).await;
    assert!(matches!(forbidden, Err(DomainError::Forbidden(_))));

    media.delete(file.id, &f.admin).await.unwrap();
    assert!(media.list_for(f.admin.id).await.unwrap().is_empty());
    assert!(matches!(
        media.read(&file.filename).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_media_upload_rejections() {
    let f = fixture().await;
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalMediaStorage::new(dir.path()).await.unwrap());
    let media = MediaService::new(f.store.clone(), storage, "", 64);
    let big = PNG.repeat(4);

    for (name, bytes) in [
        ("notes.txt", PNG),
        ("fake.png", b"not an image".as_slice()),
        ("empty.png", b"".as_slice()),
        ("big.png", big.as_slice()),
    ] {
        let result = media.upload(&f.admin, name, bytes).await;
        assert!(matches!(result, Err(DomainError::Validation(_))), "{name}");
    }
}

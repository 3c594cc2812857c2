//! Application state - shared across all handlers.

use std::collections::HashMap;
use std::sync::Arc;

use folio_core::ports::{
    Cache, CommentRepository, LikeRepository, MediaRepository, MediaStorage,
    OAuthAccountRepository, OAuthProvider, PostRepository, ProfileRepository, RateLimiter,
    SessionRepository, UserRepository,
};
use folio_core::services::{
    AuthService, CommentService, LikeService, MediaService, PostService, ProfileService,
};
use folio_infra::auth::{OAuthCredentials, ProviderKind};
use folio_infra::{
    InMemoryCache, InMemoryStore, LocalMediaStorage, OAuthClient, OAuthStateCodec,
    RandomTokenGenerator,
};

#[cfg(feature = "postgres")]
use folio_infra::database::{
    DatabaseConfig, DatabaseConnections, PostgresCommentRepository, PostgresLikeRepository,
    PostgresMediaRepository, PostgresOAuthAccountRepository, PostgresPostRepository,
    PostgresProfileRepository, PostgresSessionRepository, PostgresUserRepository,
};

use crate::config::{AppConfig, ProviderSettings};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("database: {0}")]
    Database(String),

    #[error("redis: {0}")]
    Redis(String),

    #[error("media storage: {0}")]
    Storage(String),

    #[error("OAuth provider {provider}: {message}")]
    Provider { provider: &'static str, message: String },

    #[error("rate limiter: {0}")]
    RateLimiter(String),
}

/// One handle per repository port.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub accounts: Arc<dyn OAuthAccountRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub media: Arc<dyn MediaRepository>,
}

impl Repositories {
    /// Everything backed by a single in-memory store.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            accounts: store.clone(),
            sessions: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            likes: store.clone(),
            profiles: store.clone(),
            media: store,
        }
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(db: &DatabaseConnections) -> Self {
        let conn = || db.main.clone();
        Self {
            users: Arc::new(PostgresUserRepository::new(conn())),
            accounts: Arc::new(PostgresOAuthAccountRepository::new(conn())),
            sessions: Arc::new(PostgresSessionRepository::new(conn())),
            posts: Arc::new(PostgresPostRepository::new(conn())),
            comments: Arc::new(PostgresCommentRepository::new(conn())),
            likes: Arc::new(PostgresLikeRepository::new(conn())),
            profiles: Arc::new(PostgresProfileRepository::new(conn())),
            media: Arc::new(PostgresMediaRepository::new(conn())),
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub likes: Arc<LikeService>,
    pub profile: Arc<ProfileService>,
    pub auth: Arc<AuthService>,
    pub media: Arc<MediaService>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Services,
    pub providers: Arc<HashMap<String, Arc<dyn OAuthProvider>>>,
    pub oauth_state: Arc<OAuthStateCodec>,
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    #[cfg(feature = "postgres")]
    pub db: Option<DatabaseConnections>,
}

impl AppState {
    /// Wire services from already-built adapters.
    pub fn assemble(
        config: AppConfig,
        repos: Repositories,
        cache: Arc<dyn Cache>,
        storage: Arc<dyn MediaStorage>,
        providers: Vec<Arc<dyn OAuthProvider>>,
        rate_limiter: Option<Arc<dyn RateLimiter>>,
    ) -> Self {
        let posts = Arc::new(PostService::new(
            repos.posts.clone(),
            repos.users.clone(),
            repos.likes.clone(),
        ));
        let services = Services {
            comments: Arc::new(CommentService::new(
                repos.comments.clone(),
                repos.users.clone(),
                repos.likes.clone(),
                posts.clone(),
            )),
            likes: Arc::new(LikeService::new(
                repos.likes.clone(),
                repos.posts.clone(),
                repos.comments.clone(),
            )),
            profile: Arc::new(ProfileService::new(
                repos.profiles.clone(),
                cache,
                storage.clone(),
                config.profile_cache_ttl,
                config.media.base_url.clone(),
            )),
            auth: Arc::new(AuthService::new(
                repos.users.clone(),
                repos.accounts.clone(),
                repos.sessions.clone(),
                Arc::new(RandomTokenGenerator),
                config.session_ttl(),
                config.admin_emails.clone(),
            )),
            media: Arc::new(MediaService::new(
                repos.media.clone(),
                storage,
                config.media.base_url.clone(),
                config.media.max_bytes,
            )),
            posts,
        };

        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();

        Self {
            oauth_state: Arc::new(OAuthStateCodec::new(&config.session.secret)),
            config: Arc::new(config),
            services,
            providers: Arc::new(providers),
            rate_limiter,
            #[cfg(feature = "postgres")]
            db: None,
        }
    }

    /// Build the application state from configuration, connecting to
    /// whatever backends are configured.
    pub async fn new(config: AppConfig) -> Result<Self, StartupError> {
        #[cfg(feature = "postgres")]
        let db = match &config.database {
            Some(settings) => {
                let db_config = DatabaseConfig {
                    max_connections: settings.max_connections,
                    min_connections: settings.min_connections,
                    sqlx_logging: !config.is_production(),
                    ..DatabaseConfig::new(settings.url.clone())
                };
                let connections = DatabaseConnections::init(&db_config)
                    .await
                    .map_err(|e| StartupError::Database(e.to_string()))?;
                Some(connections)
            }
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                None
            }
        };

        #[cfg(feature = "postgres")]
        let repos = match &db {
            Some(connections) => Repositories::postgres(connections),
            None => Repositories::in_memory(),
        };

        #[cfg(not(feature = "postgres"))]
        let repos = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            Repositories::in_memory()
        };

        let cache = build_cache(&config).await?;
        let storage: Arc<dyn MediaStorage> = Arc::new(
            LocalMediaStorage::new(&config.media.upload_path)
                .await
                .map_err(|e| StartupError::Storage(e.to_string()))?,
        );
        let providers = build_providers(&config)?;
        let rate_limiter = build_rate_limiter(&config).await?;

        tracing::info!(
            providers = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            rate_limited = rate_limiter.is_some(),
            "Application state initialized"
        );

        #[allow(unused_mut)]
        let mut state = Self::assemble(config, repos, cache, storage, providers, rate_limiter);
        #[cfg(feature = "postgres")]
        {
            state.db = db;
        }
        Ok(state)
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn OAuthProvider>> {
        self.providers.get(name).cloned()
    }
}

async fn build_cache(config: &AppConfig) -> Result<Arc<dyn Cache>, StartupError> {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        let cache = folio_infra::RedisCache::new(folio_infra::RedisConfig::new(url.clone()))
            .await
            .map_err(|e| StartupError::Redis(e.to_string()))?;
        return Ok(Arc::new(cache));
    }

    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but the redis feature is disabled; using in-memory cache");
    }

    Ok(Arc::new(InMemoryCache::new()))
}

fn build_providers(config: &AppConfig) -> Result<Vec<Arc<dyn OAuthProvider>>, StartupError> {
    let configured: [(ProviderKind, &Option<ProviderSettings>); 3] = [
        (ProviderKind::Google, &config.oauth.google),
        (ProviderKind::GitHub, &config.oauth.github),
        (ProviderKind::Vk, &config.oauth.vk),
    ];

    let mut providers: Vec<Arc<dyn OAuthProvider>> = Vec::new();
    for (kind, settings) in configured {
        let Some(settings) = settings else {
            tracing::debug!(provider = kind.name(), "OAuth provider not configured");
            continue;
        };
        let credentials = OAuthCredentials {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_url: config.oauth.callback_url(kind.name()),
        };
        let client = OAuthClient::new(kind, credentials).map_err(|e| StartupError::Provider {
            provider: kind.name(),
            message: e.to_string(),
        })?;
        providers.push(Arc::new(client));
    }
    Ok(providers)
}

async fn build_rate_limiter(
    config: &AppConfig,
) -> Result<Option<Arc<dyn RateLimiter>>, StartupError> {
    if !config.rate_limit.enabled {
        return Ok(None);
    }

    #[cfg(feature = "rate-limit")]
    {
        let limits = folio_infra::RateLimitConfig {
            max_requests: config.rate_limit.max_requests,
            window: config.rate_limit.window,
        };

        #[cfg(feature = "redis")]
        if let Some(url) = &config.redis_url {
            let limiter = folio_infra::RedisRateLimiter::new(
                folio_infra::RedisConfig::new(url.clone()),
                limits,
            )
            .await
            .map_err(|e| StartupError::RateLimiter(e.to_string()))?;
            return Ok(Some(Arc::new(limiter)));
        }

        let limiter = Arc::new(
            folio_infra::InMemoryRateLimiter::new(limits)
                .map_err(|e| StartupError::RateLimiter(e.to_string()))?,
        );
        limiter.spawn_pruner(folio_infra::rate_limit::PRUNE_INTERVAL);
        Ok(Some(limiter))
    }

    #[cfg(not(feature = "rate-limit"))]
    {
        tracing::warn!("Rate limiting requested but the rate-limit feature is disabled");
        Ok(None)
    }
}

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use actix_web::cookie::SameSite;

use folio_core::services::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SESSION_TTL_HOURS};

pub const DEFAULT_SESSION_SECRET: &str = "change-me-in-production";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be an absolute http(s) URL, got '{value}'")]
    InvalidUrl { key: &'static str, value: String },

    #[error("SESSION_SECRET must be set to a non-default value in production")]
    InsecureSessionSecret,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub secret: String,
    pub ttl_hours: i64,
    pub cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

/// Client credentials for one provider. A provider without both values is disabled.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// Public origin of this API, used to build callback URLs.
    pub base_url: String,
    /// Where the browser lands after login.
    pub frontend_url: String,
    pub google: Option<ProviderSettings>,
    pub github: Option<ProviderSettings>,
    pub vk: Option<ProviderSettings>,
}

impl OAuthSettings {
    pub fn callback_url(&self, provider: &str) -> String {
        format!("{}/auth/{provider}/callback", self.base_url)
    }
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub upload_path: String,
    pub base_url: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub max_requests: u32,
    pub window: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub database: Option<DatabaseSettings>,
    pub redis_url: Option<String>,
    pub session: SessionSettings,
    pub admin_emails: Vec<String>,
    pub oauth: OAuthSettings,
    pub media: MediaSettings,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit: RateLimitSettings,
    pub profile_cache_ttl: Duration,
    pub scheduler_enabled: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = Vars(lookup);
        let get = |key: &str| env.get(key);
        let provider = |prefix: &str| {
            Some(ProviderSettings {
                client_id: env.get(&format!("OAUTH_{prefix}_CLIENT_ID"))?,
                client_secret: env.get(&format!("OAUTH_{prefix}_CLIENT_SECRET"))?,
            })
        };

        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env.parse("PORT").unwrap_or(8080);
        let default_origin = format!("http://localhost:{port}");
        let base_url = get("OAUTH_BASE_URL")
            .unwrap_or_else(|| default_origin.clone())
            .trim_end_matches('/')
            .to_string();

        let database = get("DATABASE_URL").map(|url| DatabaseSettings {
            url,
            max_connections: env.parse("DB_MAX_CONNECTIONS").unwrap_or(20),
            min_connections: env.parse("DB_MIN_CONNECTIONS").unwrap_or(2),
        });

        Self {
            host,
            port,
            environment: get("RUST_ENV").unwrap_or_else(|| "development".to_string()),
            database,
            redis_url: get("REDIS_URL"),
            session: SessionSettings {
                secret: get("SESSION_SECRET").unwrap_or_else(|| DEFAULT_SESSION_SECRET.to_string()),
                ttl_hours: env.parse("SESSION_TTL_HOURS").unwrap_or(DEFAULT_SESSION_TTL_HOURS),
                cookie_name: get("COOKIE_NAME").unwrap_or_else(|| "session_id".to_string()),
                cookie_domain: get("COOKIE_DOMAIN"),
                cookie_secure: env.flag("COOKIE_SECURE", false),
                same_site: get("COOKIE_SAME_SITE")
                    .and_then(|v| parse_same_site(&v))
                    .unwrap_or(SameSite::Lax),
            },
            admin_emails: env.list("ADMIN_EMAILS"),
            oauth: OAuthSettings {
                frontend_url: get("OAUTH_FRONTEND_URL")
                    .unwrap_or_else(|| "http://localhost:5173".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                base_url,
                google: provider("GOOGLE"),
                github: provider("GITHUB"),
                vk: provider("VK"),
            },
            media: MediaSettings {
                upload_path: get("MEDIA_UPLOAD_PATH").unwrap_or_else(|| "./uploads".to_string()),
                base_url: get("MEDIA_BASE_URL")
                    .unwrap_or(default_origin)
                    .trim_end_matches('/')
                    .to_string(),
                max_bytes: env.parse("MEDIA_MAX_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },
            cors_allowed_origins: env.list("CORS_ALLOWED_ORIGINS"),
            rate_limit: RateLimitSettings {
                enabled: env.flag("RATE_LIMIT_ENABLED", true),
                max_requests: env.parse("RATE_LIMIT_MAX_REQUESTS").unwrap_or(100),
                window: Duration::from_secs(env.parse("RATE_LIMIT_WINDOW_SECS").unwrap_or(60)),
            },
            profile_cache_ttl: Duration::from_secs(env.parse("PROFILE_CACHE_TTL_SECS").unwrap_or(300)),
            scheduler_enabled: env.flag("SCHEDULER_ENABLED", true),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.ttl_hours)
    }

    /// Reject settings the server cannot safely run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url("OAUTH_BASE_URL", &self.oauth.base_url)?;
        require_http_url("OAUTH_FRONTEND_URL", &self.oauth.frontend_url)?;
        require_http_url("MEDIA_BASE_URL", &self.media.base_url)?;

        if self.session.ttl_hours <= 0 {
            return Err(ConfigError::Zero("SESSION_TTL_HOURS"));
        }
        if self.rate_limit.enabled && self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Zero("RATE_LIMIT_MAX_REQUESTS"));
        }

        if self.session.secret == DEFAULT_SESSION_SECRET {
            if self.is_production() {
                return Err(ConfigError::InsecureSessionSecret);
            }
            tracing::warn!("Using default session secret. Set SESSION_SECRET for production use.");
        }
        Ok(())
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
                None
            }
        }
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(default)
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_same_site(value: &str) -> Option<SameSite> {
    match value.to_lowercase().as_str() {
        "lax" => Some(SameSite::Lax),
        "strict" => Some(SameSite::Strict),
        "none" => Some(SameSite::None),
        _ => None,
    }
}

fn require_http_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            key,
            value: value.to_string(),
        })
    }
}

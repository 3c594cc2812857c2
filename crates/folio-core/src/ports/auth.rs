//! Authentication ports: OAuth providers and session tokens.

use async_trait::async_trait;

use crate::domain::OAuthUserInfo;

/// Parameters received on the provider callback.
#[derive(Debug, Clone, Default)]
pub struct OAuthCallback {
    pub code: String,
    /// PKCE verifier generated when the login started.
    pub code_verifier: Option<String>,
    /// Device identifier sent back by VK ID.
    pub device_id: Option<String>,
}

/// An external identity provider (Google, GitHub, VK ID).
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Short lowercase name used in routes, e.g. `github`.
    fn name(&self) -> &str;

    /// Whether the provider requires a PKCE challenge.
    fn uses_pkce(&self) -> bool {
        false
    }

    /// URL the browser is redirected to in order to log in.
    fn authorization_url(&self, state: &str, code_challenge: Option<&str>) -> String;

    /// Exchange the authorization code and fetch the user's identity.
    async fn exchange(&self, callback: &OAuthCallback) -> Result<OAuthUserInfo, AuthError>;
}

/// Source of opaque session tokens.
pub trait SessionTokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unknown OAuth provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),

    #[error("Code exchange failed: {0}")]
    Exchange(String),

    #[error("Provider returned an incomplete profile: {0}")]
    Profile(String),

    #[error("Missing or invalid session")]
    MissingSession,

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

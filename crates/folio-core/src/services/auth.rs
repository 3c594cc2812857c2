//! OAuth login and server-side sessions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::{OAuthAccount, OAuthUserInfo, Role, Session, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{
    OAuthAccountRepository, SessionRepository, SessionTokenGenerator, UserRepository,
};

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 168;

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    accounts: Arc<dyn OAuthAccountRepository>,
    sessions: Arc<dyn SessionRepository>,
    tokens: Arc<dyn SessionTokenGenerator>,
    session_ttl: Duration,
    admin_emails: HashSet<String>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        accounts: Arc<dyn OAuthAccountRepository>,
        sessions: Arc<dyn SessionRepository>,
        tokens: Arc<dyn SessionTokenGenerator>,
        session_ttl: Duration,
        admin_emails: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            users,
            accounts,
            sessions,
            tokens,
            session_ttl,
            admin_emails: admin_emails
                .into_iter()
                .map(|e| normalize_email(&e))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Resolve (or create) the local user for a provider identity and open
    /// a new session for them.
    pub async fn login_with_oauth(
        &self,
        info: OAuthUserInfo,
    ) -> Result<(User, Session), DomainError> {
        let email = info
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty());

        let user = match self.find_existing(&info, email.as_deref()).await? {
            Some(user) => {
                self.accounts.upsert(OAuthAccount::link(user.id, &info)).await?;
                user
            }
            None => self.register(&info, email).await?,
        };
        let user = self.sync_role(user).await?;

        let session = Session::new(user.id, self.tokens.generate(), self.session_ttl);
        let session = self.sessions.insert(session).await?;

        tracing::info!(
            user_id = %user.id,
            provider = %info.provider,
            role = %user.role,
            "User logged in"
        );
        Ok((user, session))
    }

    /// The user behind a session token, if the session is still active.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, DomainError> {
        if token.is_empty() {
            return Ok(None);
        }
        let Some(session) = self.sessions.find_active(token, Utc::now()).await? else {
            return Ok(None);
        };
        Ok(self.users.find_by_id(session.user_id).await?)
    }

    pub async fn logout(&self, token: &str) -> Result<(), DomainError> {
        self.sessions.delete(token).await?;
        tracing::debug!("Session closed");
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64, DomainError> {
        let removed = self.sessions.delete_expired(Utc::now()).await?;
        tracing::info!(removed, "Expired sessions cleaned up");
        Ok(removed)
    }

    async fn find_existing(
        &self,
        info: &OAuthUserInfo,
        email: Option<&str>,
    ) -> Result<Option<User>, DomainError> {
        if let Some(account) = self
            .accounts
            .find_by_provider(&info.provider, &info.provider_user_id)
            .await?
        {
            let user = self.users.find_by_id(account.user_id).await?;
            if user.is_some() {
                return Ok(user);
            }
            tracing::warn!(user_id = %account.user_id, "OAuth account points at a missing user");
        }

        match email {
            Some(email) => Ok(self.users.find_by_email(email).await?),
            None => Ok(None),
        }
    }

    /// Create the user and their provider link together.
    async fn register(
        &self,
        info: &OAuthUserInfo,
        email: Option<String>,
    ) -> Result<User, DomainError> {
        let email = email.ok_or_else(|| {
            DomainError::Validation(format!(
                "{} did not share an email address, which is required to sign up",
                info.provider
            ))
        })?;

        let role = self.role_for(&email);
        let user = User::new(
            email.clone(),
            info.display_name(),
            info.avatar_url.clone(),
            role,
        );
        let account = OAuthAccount::link(user.id, info);

        match self.users.register(user, account).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, provider = %info.provider, "User registered");
                Ok(user)
            }
            // Another request registered the same email first.
            Err(RepoError::Constraint(_)) => {
                let user = self
                    .users
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| DomainError::Conflict("user registration raced".into()))?;
                self.accounts.upsert(OAuthAccount::link(user.id, info)).await?;
                Ok(user)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn sync_role(&self, mut user: User) -> Result<User, DomainError> {
        if user.role == Role::User && self.role_for(&user.email) == Role::Admin {
            user.role = Role::Admin;
            user = self.users.update(user).await?;
            tracing::info!(user_id = %user.id, "User promoted to admin");
        }
        Ok(user)
    }

    fn role_for(&self, email: &str) -> Role {
        if self.admin_emails.contains(&normalize_email(email)) {
            Role::Admin
        } else {
            Role::User
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

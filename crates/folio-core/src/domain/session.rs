use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side login session, referenced by an opaque cookie token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, token: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Link between a local user and an identity at an OAuth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthAccount {
    pub fn link(user_id: Uuid, info: &OAuthUserInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider: info.provider.clone(),
            provider_user_id: info.provider_user_id.clone(),
            access_token: info.access_token.clone(),
            refresh_token: info.refresh_token.clone(),
            expires_at: info.expires_at,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Identity returned by a provider after a successful code exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    pub provider: String,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthUserInfo {
    /// Display name, falling back to the local part of the email.
    pub fn display_name(&self) -> String {
        match (&self.name, &self.email) {
            (Some(name), _) if !name.trim().is_empty() => name.trim().to_string(),
            (_, Some(email)) => email.split('@').next().unwrap_or_default().to_string(),
            _ => format!("{} user", self.provider),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry() {
        let session = Session::new(Uuid::new_v4(), "tok".into(), Duration::hours(1));
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(Utc::now() + Duration::hours(2)));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let info = OAuthUserInfo {
            provider: "github".into(),
            email: Some("jane@example.com".into()),
            name: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(info.display_name(), "jane");
    }
}

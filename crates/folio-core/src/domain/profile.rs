use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Contact links shown on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contacts {
    pub email: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub vk: Option<String>,
}

/// The site owner's public profile. There is exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub activity: String,
    pub contacts: Contacts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub contacts: Contacts,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > 255 {
            return Err(DomainError::Validation(
                "name must be between 1 and 255 characters".into(),
            ));
        }
        if let Some(email) = self.contacts.email.as_deref().filter(|e| !e.is_empty()) {
            if !email.contains('@') {
                return Err(DomainError::Validation(
                    "contacts.email must be an email address".into(),
                ));
            }
        }
        Ok(())
    }

    /// Merge this input into an existing profile, or build the first one.
    pub fn apply(self, existing: Option<Profile>, now: DateTime<Utc>) -> Profile {
        let (id, created_at) = existing
            .map(|p| (p.id, p.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), now));
        Profile {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            photo_url: self.photo_url.filter(|p| !p.trim().is_empty()),
            activity: self.activity,
            contacts: self.contacts,
            created_at,
            updated_at: now,
        }
    }
}

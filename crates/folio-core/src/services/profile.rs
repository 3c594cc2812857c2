//! Site profile with a read-through, write-through cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::{Profile, ProfileInput};
use crate::error::DomainError;
use crate::ports::{Cache, MediaStorage, ProfileRepository, get_json, set_json};

pub const PROFILE_CACHE_KEY: &str = "profile";
pub const DEFAULT_PROFILE_TTL: Duration = Duration::from_secs(5 * 60);

pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    cache: Arc<dyn Cache>,
    storage: Arc<dyn MediaStorage>,
    ttl: Duration,
    media_base_url: String,
}

impl ProfileService {
    /// `media_base_url` is the public origin uploaded files are served from;
    /// photos under it are treated as local uploads.
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        cache: Arc<dyn Cache>,
        storage: Arc<dyn MediaStorage>,
        ttl: Duration,
        media_base_url: impl Into<String>,
    ) -> Self {
        Self {
            profiles,
            cache,
            storage,
            ttl,
            media_base_url: media_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn get(&self) -> Result<Profile, DomainError> {
        if let Some(profile) = get_json::<Profile>(self.cache.as_ref(), PROFILE_CACHE_KEY).await {
            tracing::debug!("Profile served from cache");
            return Ok(profile);
        }

        let profile = self
            .profiles
            .get()
            .await?
            .ok_or_else(|| DomainError::not_found("profile", "site"))?;
        self.store_in_cache(&profile).await;
        Ok(profile)
    }

    pub async fn update(&self, input: ProfileInput) -> Result<Profile, DomainError> {
        input.validate()?;

        let existing = self.profiles.get().await?;
        let old_photo = existing.as_ref().and_then(|p| p.photo_url.clone());
        let profile = self
            .profiles
            .upsert(input.apply(existing, Utc::now()))
            .await?;

        // Write through so the next read never sees the old profile.
        self.store_in_cache(&profile).await;

        if let Some(old) = old_photo.filter(|old| profile.photo_url.as_ref() != Some(old)) {
            self.remove_local_photo(&old).await;
        }

        tracing::info!(profile_id = %profile.id, "Profile updated");
        Ok(profile)
    }

    async fn store_in_cache(&self, profile: &Profile) {
        if let Err(e) =
            set_json(self.cache.as_ref(), PROFILE_CACHE_KEY, profile, Some(self.ttl)).await
        {
            tracing::warn!(error = %e, "Failed to cache profile, dropping stale entry");
            if let Err(e) = self.cache.delete(PROFILE_CACHE_KEY).await {
                tracing::warn!(error = %e, "Failed to invalidate profile cache");
            }
        }
    }

    async fn remove_local_photo(&self, url: &str) {
        let Some(filename) = self.local_media_name(url) else {
            return;
        };
        match self.storage.delete(filename).await {
            Ok(()) => tracing::info!(filename, "Removed replaced profile photo"),
            Err(e) => tracing::warn!(filename, error = %e, "Failed to remove old profile photo"),
        }
    }

    /// File name of a photo that was uploaded to this site.
    fn local_media_name<'a>(&self, url: &'a str) -> Option<&'a str> {
        let path = if self.media_base_url.is_empty() {
            url
        } else {
            url.strip_prefix(self.media_base_url.as_str()).unwrap_or(url)
        };
        path.strip_prefix("/media/")
            .filter(|name| !name.is_empty() && !name.contains('/'))
    }
}

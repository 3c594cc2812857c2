//! Image uploads.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{ImageFormat, MediaFile, User};
use crate::error::DomainError;
use crate::ports::{MediaRepository, MediaStorage, StorageError};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub struct MediaService {
    media: Arc<dyn MediaRepository>,
    storage: Arc<dyn MediaStorage>,
    base_url: String,
    max_bytes: usize,
}

impl MediaService {
    pub fn new(
        media: Arc<dyn MediaRepository>,
        storage: Arc<dyn MediaStorage>,
        base_url: impl Into<String>,
        max_bytes: usize,
    ) -> Self {
        Self {
            media,
            storage,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn upload(
        &self,
        uploader: &User,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<MediaFile, DomainError> {
        if bytes.is_empty() {
            return Err(DomainError::Validation("file is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(DomainError::Validation(format!(
                "file exceeds the {} byte limit",
                self.max_bytes
            )));
        }

        let declared = original_name
            .rsplit_once('.')
            .and_then(|(_, ext)| ImageFormat::from_extension(ext))
            .ok_or_else(|| {
                DomainError::Validation("only jpg, jpeg, png, webp and gif files are allowed".into())
            })?;
        let format = ImageFormat::sniff(bytes).ok_or_else(|| {
            DomainError::Validation(format!(
                "file content is not a valid {} image",
                declared.extension()
            ))
        })?;

        let id = Uuid::new_v4();
        let filename = format!("{id}.{}", format.extension());
        self.storage.save(&filename, bytes).await.map_err(storage_error)?;

        let file = MediaFile {
            id,
            uploader_id: uploader.id,
            filename: filename.clone(),
            original_name: original_name.to_string(),
            mime_type: format.mime_type().to_string(),
            size_bytes: bytes.len() as i64,
            created_at: Utc::now(),
        };

        match self.media.insert(file).await {
            Ok(file) => {
                tracing::info!(media_id = %file.id, filename = %file.filename, size = file.size_bytes, "Media uploaded");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&filename).await {
                    tracing::warn!(filename = %filename, error = %cleanup, "Failed to clean up orphaned upload");
                }
                Err(e.into())
            }
        }
    }

    /// Delete an upload. Its uploader or an admin may.
    pub async fn delete(&self, id: Uuid, actor: &User) -> Result<(), DomainError> {
        let file = self
            .media
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("media", id))?;
        if !actor.can_manage(file.uploader_id) {
            return Err(DomainError::Forbidden(
                "only the uploader can delete this file".into(),
            ));
        }

        self.storage.delete(&file.filename).await.map_err(storage_error)?;
        self.media.delete(id).await?;
        tracing::info!(media_id = %id, "Media deleted");
        Ok(())
    }

    pub async fn list_for(&self, uploader_id: Uuid) -> Result<Vec<MediaFile>, DomainError> {
        Ok(self.media.list_by_uploader(uploader_id).await?)
    }

    /// File contents and MIME type for serving.
    pub async fn read(&self, filename: &str) -> Result<(Vec<u8>, &'static str), DomainError> {
        let format = filename
            .rsplit_once('.')
            .and_then(|(_, ext)| ImageFormat::from_extension(ext))
            .ok_or_else(|| DomainError::not_found("media", filename))?;
        let bytes = self.storage.load(filename).await.map_err(storage_error)?;
        Ok((bytes, format.mime_type()))
    }

    pub fn public_url(&self, file: &MediaFile) -> String {
        format!("{}/media/{}", self.base_url, file.filename)
    }
}

fn storage_error(err: StorageError) -> DomainError {
    match err {
        StorageError::NotFound(name) => DomainError::not_found("media", name),
        StorageError::InvalidName(name) => DomainError::Validation(format!("invalid file name '{name}'")),
        StorageError::Io(msg) => DomainError::Internal(msg),
    }
}

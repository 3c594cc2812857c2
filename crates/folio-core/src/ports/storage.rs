use async_trait::async_trait;

/// Blob storage for uploaded media.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn load(&self, filename: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove a file. Removing a missing file is not an error.
    async fn delete(&self, filename: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),
}

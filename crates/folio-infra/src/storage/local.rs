use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use folio_core::ports::{MediaStorage, StorageError};

/// Stores uploads as flat files inside a single directory.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    /// Create the upload directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", root.display())))?;
        tracing::info!(path = %root.display(), "Media storage ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only plain file names are accepted: no separators, no `..`, no hidden files.
    fn path_for(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let valid = !filename.is_empty()
            && !filename.starts_with('.')
            && filename
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidName(filename.to_string()));
        }
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(filename)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tracing::debug!(filename, size = bytes.len(), "Stored media file");
        Ok(())
    }

    async fn load(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(filename)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(filename.to_string()),
            _ => StorageError::Io(e.to_string()),
        })
    }

    async fn delete(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path().join("uploads")).await.unwrap();

        storage.save("a.png", b"png-bytes").await.unwrap();
        assert_eq!(storage.load("a.png").await.unwrap(), b"png-bytes");

        storage.delete("a.png").await.unwrap();
        assert!(matches!(
            storage.load("a.png").await,
            Err(StorageError::NotFound(_))
        ));
        // Deleting again is fine.
        storage.delete("a.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path()).await.unwrap();

        for name in ["../etc/passwd", "a/b.png", ".env", "", "..", "x\\y.png"] {
            assert!(
                matches!(storage.save(name, b"x").await, Err(StorageError::InvalidName(_))),
                "{name} should be rejected"
            );
        }
    }
}

//! Filesystem storage provider.
//!
//! Keeps every object as a plain file in one flat directory. Subdirectories
//! and entries whose names are not valid UTF-8 are ignored.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{StorageError, StorageProvider};

/// Flat directory storage backend.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Open (and create if needed) a storage area at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(StorageError::Io {
                name: name.to_string(),
                reason: "object names must be flat".into(),
            });
        }
        Ok(self.root.join(name))
    }

    fn io_error(name: &str, err: std::io::Error) -> StorageError {
        StorageError::Io {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }

    /// An object that cannot be found is only absent while the root exists.
    async fn ensure_root(&self) -> Result<(), StorageError> {
        self.check_health().await
    }
}

#[async_trait]
impl StorageProvider for FsStorage {
    async fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            StorageError::Unavailable(format!("cannot list {}: {e}", self.root.display()))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => debug!(name = ?raw, "Skipping non UTF-8 entry"),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.object_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.ensure_root().await?;
                Ok(None)
            }
            Err(e) => Err(Self::io_error(name, e)),
        }
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(name)?;
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.ensure_root().await?;
                Err(Self::io_error(name, e))
            }
            Err(e) => Err(Self::io_error(name, e)),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.object_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.ensure_root().await?;
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(Self::io_error(name, e)),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.object_path(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.ensure_root().await?;
                Ok(false)
            }
            Err(e) => Err(Self::io_error(name, e)),
        }
    }

    async fn check_health(&self) -> Result<(), StorageError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) => Err(StorageError::Unavailable(format!(
                "{}: {e}",
                self.root.display()
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path()).unwrap();

        storage.write("rec.txt", b"{\"a\":1}").await.unwrap();
        assert!(storage.exists("rec.txt").await.unwrap());
        assert_eq!(
            storage.read("rec.txt").await.unwrap().as_deref(),
            Some(&b"{\"a\":1}"[..])
        );
        assert_eq!(storage.list().await.unwrap(), vec!["rec.txt".to_string()]);

        storage.delete("rec.txt").await.unwrap();
        assert_eq!(storage.read("rec.txt").await.unwrap(), None);
        assert!(!storage.exists("rec.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_fs_list_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.wav"), b"RIFF").unwrap();

        let storage = FsStorage::new(dir.path()).unwrap();
        assert_eq!(storage.list().await.unwrap(), vec!["a.wav".to_string()]);
    }

    #[tokio::test]
    async fn test_fs_rejects_nested_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path()).unwrap();
        assert!(storage.write("../escape.txt", b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_fs_health_after_removal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("area");
        let storage = FsStorage::new(&root).unwrap();
        assert!(storage.check_health().await.is_ok());

        std::fs::remove_dir_all(&root).unwrap();
        assert!(matches!(
            storage.check_health().await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            storage.list().await,
            Err(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_missing_root_is_not_absence() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("area");
        let storage = FsStorage::new(&root).unwrap();
        assert_eq!(storage.read("rec.txt").await.unwrap(), None);

        std::fs::remove_dir_all(&root).unwrap();
        assert!(matches!(
            storage.read("rec.txt").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            storage.write("rec.txt", b"{}").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            storage.exists("rec.wav").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            storage.delete("rec.wav").await,
            Err(StorageError::Unavailable(_))
        ));
    }
}

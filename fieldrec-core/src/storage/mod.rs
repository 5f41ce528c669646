//! Storage providers for recordings and their metadata documents.
//!
//! A provider is a flat, byte-addressable namespace. Recordings and
//! metadata documents share a base name and are told apart by suffix:
//!
//! ```text
//! <storage area>/
//! ├── 2024-03-21_14-05-30_51.50101_-0.12419_10_52.wav   ← asset
//! └── 2024-03-21_14-05-30_51.50101_-0.12419_10_52.txt   ← metadata document (JSON)
//! ```
//!
//! Providers are treated as unreliable: any individual operation may fail
//! independently of the others. Only [`StorageError::Unavailable`] means the
//! backend itself cannot be reached.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;

/// Suffix of recording assets.
pub const ASSET_SUFFIX: &str = ".wav";

/// Suffix of metadata documents.
pub const DOCUMENT_SUFFIX: &str = ".txt";

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("I/O error on {name}: {reason}")]
    Io { name: String, reason: String },
}

/// Byte-addressable name to content store.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// List every object name in the storage area.
    async fn list(&self) -> Result<Vec<String>, StorageError>;

    /// Read an object. Absence is `Ok(None)`, not an error.
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write an object, replacing any previous content.
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Delete an object.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;

    /// Existence check.
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.read(name).await?.is_some())
    }

    /// Check that the backend can be reached at all.
    async fn check_health(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Short backend label for diagnostics.
    fn backend_name(&self) -> &'static str;
}

/// Which half of a record an object name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Asset,
    Document,
}

impl ObjectKind {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Asset => ASSET_SUFFIX,
            Self::Document => DOCUMENT_SUFFIX,
        }
    }

    /// Object name for a record base name.
    pub fn object_name(self, base_name: &str) -> String {
        format!("{base_name}{}", self.suffix())
    }
}

/// Split an object name into its kind and base name.
///
/// Names carrying neither suffix are not part of any record.
pub fn split_object_name(name: &str) -> Option<(ObjectKind, &str)> {
    if let Some(base) = name.strip_suffix(ASSET_SUFFIX) {
        Some((ObjectKind::Asset, base))
    } else {
        name.strip_suffix(DOCUMENT_SUFFIX)
            .map(|base| (ObjectKind::Document, base))
    }
}

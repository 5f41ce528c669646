use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum FieldrecError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Corrupt metadata document {name}: {reason}")]
    CorruptDocument { name: String, reason: String },

    #[error("Invalid capture filename {name}: {reason}")]
    InvalidFilename { name: String, reason: String },

    #[error("Grid reference error: {0}")]
    Grid(#[from] crate::geodetic::GridError),

    #[error("Export error: {0}")]
    Export(#[from] crate::export::ExportError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FieldrecError {
    /// Lift a provider error, keeping unreachability distinct from per-object failures.
    pub fn from_provider(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(reason) => Self::StorageUnavailable(reason),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldrecError>;

//! Export capabilities: download sinks, share targets and CSV rendering.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors from an export sink.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export destination unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write {name}: {reason}")]
    Write { name: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(String),
}

/// Failure modes of a share capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The user dismissed the share dialog.
    #[error("Share cancelled")]
    Cancelled,

    #[error("Share failed: {0}")]
    Failed(String),
}

/// A file handed to a sink or share target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    pub fn audio(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: "audio/wav",
            bytes,
        }
    }

    /// Plain text; share targets reject structured payloads.
    pub fn text(name: impl Into<String>, text: String) -> Self {
        Self {
            name: name.into(),
            content_type: "text/plain",
            bytes: text.into_bytes(),
        }
    }

    pub fn csv(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: "text/csv",
            bytes,
        }
    }
}

/// Destination for downloaded files. Each delivery is independent.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn deliver(&self, file: ExportFile) -> Result<(), ExportError>;
}

/// Platform share capability.
#[async_trait]
pub trait ShareTarget: Send + Sync {
    /// Whether sharing exists on this platform at all.
    fn is_supported(&self) -> bool;

    /// Share every file in one invocation.
    async fn share(&self, files: Vec<ExportFile>) -> Result<(), ShareError>;
}

/// Share target for platforms without a share capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedShareTarget;

#[async_trait]
impl ShareTarget for UnsupportedShareTarget {
    fn is_supported(&self) -> bool {
        false
    }

    async fn share(&self, _files: Vec<ExportFile>) -> Result<(), ShareError> {
        Err(ShareError::Failed("sharing is not supported".into()))
    }
}

/// Writes exported files into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryExportSink {
    dir: PathBuf,
}

impl DirectoryExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ExportError::Unavailable(format!("{}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for DirectoryExportSink {
    async fn deliver(&self, file: ExportFile) -> Result<(), ExportError> {
        if file.name.contains('/') || file.name.contains('\\') {
            return Err(ExportError::Write {
                name: file.name,
                reason: "file names must be flat".into(),
            });
        }
        let path = self.dir.join(&file.name);
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| ExportError::Write {
                name: file.name.clone(),
                reason: e.to_string(),
            })?;
        debug!(path = %path.display(), bytes = file.bytes.len(), "Delivered export");
        Ok(())
    }
}

/// Render rows as CSV with a header line.
pub fn render_csv(header: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))
}

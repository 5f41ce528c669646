//! Fieldrec Core - record store and batch lifecycle engine for field recordings
//!
//! A record is a pair of objects sharing a base name in one flat storage
//! area: the recording asset (`.wav`) and its metadata document (`.txt`,
//! JSON). Either half may exist without the other.
//!
//! # Features
//!
//! - Lazy document creation and transparent schema migration on read
//! - Per-record sequencing of document mutations
//! - Batch delete, download, share, CSV export and history trimming with
//!   per-item outcomes
//! - Grid reference precision reconciliation (geohash and OS National Grid)
//! - Reverse geocoding with soft failure (`network` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fieldrec_core::{
//!     BatchOperationEngine, FsStorage, RecordStore, Selection, StoreConfig, TrimMode, TrimPlan,
//! };
//!
//! # async fn example() -> fieldrec_core::Result<()> {
//! let storage = Arc::new(FsStorage::new("recordings")?);
//! let store = Arc::new(RecordStore::new(storage, StoreConfig::from_env()));
//!
//! // Creates the document with defaults taken from the filename
//! let doc = store
//!     .get_or_create_metadata("2024-03-21_14-05-30_51.50101_-0.12419_10_52")
//!     .await?;
//! println!("{}", doc.to_text()?);
//!
//! // Clear the last download entry of every record
//! let records = store.enumerate().await?;
//! let engine = BatchOperationEngine::new(store);
//! let plan = TrimPlan { downloads: TrimMode::Last, ..TrimPlan::default() };
//! let report = engine.trim_history(&Selection::all(&records), plan).await?;
//! println!("{} trimmed, {} failed", report.completed(), report.failed());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod filename;
pub mod geodetic;
pub mod history;
pub mod listing;
pub mod report;
pub mod schema;
pub mod selection;
pub mod storage;
pub mod store;

#[cfg(feature = "network")]
pub mod geocode;

// Re-export main types for convenience
pub use batch::{BatchOperation, BatchOperationEngine, BatchOutcome, DeleteScope, ShareOutcome};
pub use config::{StoreConfig, DEFAULT_GEOREF_PRECISION};
pub use error::{FieldrecError, Result};
pub use export::{
    DirectoryExportSink, ExportError, ExportFile, ExportSink, ShareError, ShareTarget,
    UnsupportedShareTarget,
};
pub use filename::{CaptureDetails, CaptureLocation, DisplayDetails};
pub use geodetic::{
    CoordinateBasis, GeohashGrid, GeorefFormat, GridError, GridSystem, LatLon, OsGrid,
    PrecisionReconciler, Reconciliation,
};
pub use history::{HistoryCategory, MetadataHistory, TrimMode, TrimPlan};
pub use listing::{summarize, RecordSummary};
pub use report::{BatchReport, ItemOutcome, ItemReport};
pub use schema::{fields, FieldDefinition, MetadataDocument, Schema};
pub use selection::Selection;
pub use storage::{FsStorage, MemoryStorage, ObjectKind, StorageError, StorageProvider};
pub use store::{RecordPresence, RecordStore};

#[cfg(feature = "network")]
pub use geocode::{NominatimConfig, NominatimGeocoder};

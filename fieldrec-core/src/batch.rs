//! Batch operations over a caller-supplied selection of records.
//!
//! The engine is stateless between calls: selection state and export
//! capabilities are passed into each call. Every per-item failure ends up in
//! the returned [`BatchReport`]; only an unreachable storage provider aborts
//! a batch.
//!
//! Mutations of one record go through [`RecordStore::update`] or
//! [`RecordStore::delete`], which sequence them per base name. Work on
//! different records runs concurrently.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{FieldrecError, Result};
use crate::export::{render_csv, ExportFile, ExportSink, ShareError, ShareTarget};
use crate::history::{timestamp_label, HistoryCategory, TrimPlan};
use crate::report::{BatchReport, ItemOutcome, ItemReport};
use crate::schema::{fields, MetadataDocument};
use crate::selection::Selection;
use crate::storage::ObjectKind;
use crate::store::RecordStore;

/// Which halves of each selected record a delete removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// Asset and document.
    All,
    AssetOnly,
}

/// Result of a share request, as the caller needs to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ShareOutcome {
    Shared,
    /// User dismissed the dialog. Not an error.
    Cancelled,
    Failed(String),
    /// No share capability on this platform.
    Unsupported,
}

impl ShareOutcome {
    /// Message to show the user, if any. Cancellation is silent.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Shared => Some("Shared".to_string()),
            Self::Cancelled => None,
            Self::Failed(reason) => Some(format!("Share failed: {reason}")),
            Self::Unsupported => Some("Sharing is not supported on this platform".to_string()),
        }
    }
}

/// An operation to apply to a selection.
pub enum BatchOperation<'a> {
    DeleteAll,
    DeleteAssetOnly,
    Download(&'a dyn ExportSink),
    Share(&'a dyn ShareTarget),
    ExportCsv(&'a dyn ExportSink),
    TrimHistory(TrimPlan),
}

impl BatchOperation<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeleteAll => "delete",
            Self::DeleteAssetOnly => "delete-asset",
            Self::Download(_) => "download",
            Self::Share(_) => "share",
            Self::ExportCsv(_) => "csv",
            Self::TrimHistory(_) => "trim-history",
        }
    }
}

impl std::fmt::Debug for BatchOperation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrimHistory(plan) => f.debug_tuple("TrimHistory").field(plan).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// What a batch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Report(BatchReport),
    Share(ShareOutcome),
}

/// Applies batch operations through a [`RecordStore`].
#[derive(Debug, Clone)]
pub struct BatchOperationEngine {
    store: Arc<RecordStore>,
}

impl BatchOperationEngine {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Dispatch an operation.
    pub async fn run(
        &self,
        selection: &Selection,
        operation: BatchOperation<'_>,
    ) -> Result<BatchOutcome> {
        debug!(operation = operation.name(), records = selection.len(), "Running batch");
        let report = match operation {
            BatchOperation::DeleteAll => self.delete(selection, DeleteScope::All).await?,
            BatchOperation::DeleteAssetOnly => {
                self.delete(selection, DeleteScope::AssetOnly).await?
            }
            BatchOperation::Download(sink) => self.download(selection, sink).await?,
            BatchOperation::Share(target) => {
                return self.share(selection, target).await.map(BatchOutcome::Share)
            }
            BatchOperation::ExportCsv(sink) => self.export_csv(selection, sink).await?,
            BatchOperation::TrimHistory(plan) => self.trim_history(selection, plan).await?,
        };
        Ok(BatchOutcome::Report(report))
    }

    /// Delete the selected records' objects within `scope`.
    ///
    /// Presence is checked per record, then every existing object in scope is
    /// handed to one bulk delete. Re-enumerate afterwards for the real state.
    #[instrument(level = "debug", skip(self, selection), fields(records = selection.len()))]
    pub async fn delete(&self, selection: &Selection, scope: DeleteScope) -> Result<BatchReport> {
        self.ensure_available().await?;

        let checks = selection.into_iter().map(|name| async move {
            (name, self.store.presence(name).await)
        });
        let presences = join_all(checks).await;

        let mut targets = Vec::new();
        let mut items = Vec::new();
        for (name, presence) in presences {
            let before = targets.len();
            if presence.asset {
                targets.push(ObjectKind::Asset.object_name(name));
            }
            if presence.document && scope == DeleteScope::All {
                targets.push(ObjectKind::Document.object_name(name));
            }
            if targets.len() == before {
                items.push(ItemReport::skipped(name.clone(), "nothing to delete"));
            }
        }

        if !targets.is_empty() {
            items.extend(self.store.delete(&targets).await?);
        }

        let report = BatchReport::new("delete", items);
        info!(
            deleted = report.completed(),
            failed = report.failed(),
            ?scope,
            "Batch delete finished"
        );
        Ok(report)
    }

    /// Export each selected record's asset and, outside legacy mode, its
    /// document through `sink`. Every export is independent.
    #[instrument(level = "debug", skip(self, selection, sink), fields(records = selection.len()))]
    pub async fn download(
        &self,
        selection: &Selection,
        sink: &dyn ExportSink,
    ) -> Result<BatchReport> {
        self.ensure_available().await?;

        let per_record = selection.into_iter().map(|name| async move {
            let files = self.exportable_files(name).await;
            if files.is_empty() {
                return (name, vec![ItemReport::skipped(name.clone(), "nothing to export")]);
            }
            let deliveries = files.into_iter().map(|file| async move {
                match file {
                    Ok(file) => {
                        let object = file.name.clone();
                        match sink.deliver(file).await {
                            Ok(()) => ItemReport::completed(object),
                            Err(e) => {
                                warn!(name = %object, error = %e, "Download failed");
                                ItemReport::failed(object, e)
                            }
                        }
                    }
                    Err(report) => report,
                }
            });
            (name, join_all(deliveries).await)
        });
        let results = join_all(per_record).await;

        let exported = records_with_completed(&results);
        self.record_event(&exported, HistoryCategory::Downloads).await;

        let items = results.into_iter().flat_map(|(_, reports)| reports).collect();
        let report = BatchReport::new("download", items);
        info!(
            exported = report.completed(),
            failed = report.failed(),
            "Batch download finished"
        );
        Ok(report)
    }

    /// Share the whole selection in one invocation of `target`.
    #[instrument(level = "debug", skip(self, selection, target), fields(records = selection.len()))]
    pub async fn share(
        &self,
        selection: &Selection,
        target: &dyn ShareTarget,
    ) -> Result<ShareOutcome> {
        if !target.is_supported() {
            info!("Share capability unavailable");
            return Ok(ShareOutcome::Unsupported);
        }
        self.ensure_available().await?;

        let gathered = join_all(
            selection
                .into_iter()
                .map(|name| async move { (name, self.exportable_files(name).await) }),
        )
        .await;

        let mut bundle = Vec::new();
        let mut contributors = Vec::new();
        for (name, files) in gathered {
            let mut contributed = false;
            for file in files {
                match file {
                    Ok(file) => {
                        bundle.push(file);
                        contributed = true;
                    }
                    Err(report) => {
                        warn!(name = %report.name, outcome = ?report.outcome, "Left out of share")
                    }
                }
            }
            if contributed {
                contributors.push(name.clone());
            }
        }

        if bundle.is_empty() {
            return Ok(ShareOutcome::Failed(
                "nothing in the selection can be shared".to_string(),
            ));
        }

        let outcome = match target.share(bundle).await {
            Ok(()) => ShareOutcome::Shared,
            Err(ShareError::Cancelled) => {
                debug!("Share cancelled by user");
                ShareOutcome::Cancelled
            }
            Err(ShareError::Failed(reason)) => {
                warn!(reason = %reason, "Share failed");
                ShareOutcome::Failed(reason)
            }
        };

        if outcome == ShareOutcome::Shared {
            self.record_event(&contributors, HistoryCategory::Shares)
                .await;
        }
        Ok(outcome)
    }

    /// Write one CSV of the selected records' fields through `sink`.
    ///
    /// Columns are `filename` followed by every schema field except the
    /// history. Records whose document cannot be read are reported and left
    /// out of the file.
    #[instrument(level = "debug", skip(self, selection, sink), fields(records = selection.len()))]
    pub async fn export_csv(
        &self,
        selection: &Selection,
        sink: &dyn ExportSink,
    ) -> Result<BatchReport> {
        self.ensure_available().await?;

        let columns: Vec<&'static str> = self
            .store
            .schema()
            .field_ids()
            .into_iter()
            .filter(|id| *id != fields::HISTORY)
            .collect();

        let loaded = join_all(
            selection
                .into_iter()
                .map(|name| async move { (name, self.document_for_export(name).await) }),
        )
        .await;

        let mut rows = Vec::new();
        let mut included = Vec::new();
        let mut items = Vec::new();
        for (name, doc) in loaded {
            match doc {
                Ok(doc) => {
                    let mut row = vec![name.clone()];
                    row.extend(columns.iter().map(|id| doc.get_str(id).unwrap_or_default()));
                    rows.push(row);
                    included.push(name.clone());
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "Record left out of CSV");
                    items.push(ItemReport::failed(name.clone(), e));
                }
            }
        }

        if included.is_empty() {
            return Ok(BatchReport::new("csv", items));
        }

        let mut header = vec!["filename"];
        header.extend(columns.iter().copied());
        let bytes = render_csv(&header, &rows)?;
        let file_name = format!("records_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));

        match sink.deliver(ExportFile::csv(file_name.clone(), bytes)).await {
            Ok(()) => {
                info!(file = %file_name, rows = included.len(), "Exported CSV");
                self.record_event(&included, HistoryCategory::Csvs).await;
                items.extend(included.into_iter().map(ItemReport::completed));
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "CSV delivery failed");
                let reason = e.to_string();
                items.extend(
                    included
                        .into_iter()
                        .map(|name| ItemReport::failed(name, &reason)),
                );
            }
        }
        Ok(BatchReport::new("csv", items))
    }

    /// Apply `plan` to the history of each selected record.
    ///
    /// Each record's document is written at most once, with all three
    /// categories trimmed together.
    #[instrument(level = "debug", skip(self, selection), fields(records = selection.len()))]
    pub async fn trim_history(&self, selection: &Selection, plan: TrimPlan) -> Result<BatchReport> {
        if plan.is_noop() {
            let items = selection
                .into_iter()
                .map(|name| ItemReport::skipped(name.clone(), "no trim requested"))
                .collect();
            return Ok(BatchReport::new("trim-history", items));
        }
        if self.store.is_legacy() {
            let items = selection
                .into_iter()
                .map(|name| ItemReport::skipped(name.clone(), "no documents in legacy mode"))
                .collect();
            return Ok(BatchReport::new("trim-history", items));
        }
        self.ensure_available().await?;

        let trims = selection.into_iter().map(|name| async move {
            if !self.store.presence(name).await.document {
                return ItemReport::skipped(name.clone(), "no document");
            }
            let result = self
                .store
                .update(name, move |doc| {
                    let mut history =
                        doc.history_for_update(&ObjectKind::Document.object_name(name))?;
                    let changed = history.apply(&plan);
                    if changed {
                        doc.set_history(&history)?;
                    }
                    Ok(changed)
                })
                .await;
            match result {
                Ok(_) => ItemReport::completed(name.clone()),
                Err(e) => {
                    warn!(name = %name, error = %e, "Could not trim history");
                    ItemReport::failed(name.clone(), e)
                }
            }
        });

        let report = BatchReport::new("trim-history", join_all(trims).await);
        info!(
            trimmed = report.completed(),
            failed = report.failed(),
            "History trim finished"
        );
        Ok(report)
    }

    async fn ensure_available(&self) -> Result<()> {
        self.store
            .provider()
            .check_health()
            .await
            .map_err(|e| FieldrecError::StorageUnavailable(e.to_string()))
    }

    /// Files a record contributes to a download or share.
    ///
    /// Read failures come back as failed item reports so the caller can
    /// keep going.
    async fn exportable_files(&self, name: &str) -> Vec<std::result::Result<ExportFile, ItemReport>> {
        let presence = self.store.presence(name).await;
        let mut files = Vec::new();

        if presence.asset {
            let object = ObjectKind::Asset.object_name(name);
            files.push(match self.store.read_object(&object).await {
                Ok(Some(bytes)) => Ok(ExportFile::audio(object, bytes)),
                Ok(None) => Err(ItemReport::failed(object, "asset vanished before export")),
                Err(e) => Err(ItemReport::failed(object, e)),
            });
        }

        if presence.document && !self.store.is_legacy() {
            let object = ObjectKind::Document.object_name(name);
            let text = self
                .store
                .get_or_create_metadata(name)
                .await
                .and_then(|doc| doc.to_text());
            files.push(match text {
                Ok(text) => Ok(ExportFile::text(object, text)),
                Err(e) => Err(ItemReport::failed(object, e)),
            });
        }

        files
    }

    /// The document a CSV row is built from. Legacy mode has no documents,
    /// so rows carry the defaults derived from the filename.
    async fn document_for_export(&self, name: &str) -> Result<MetadataDocument> {
        if self.store.is_legacy() {
            return Ok(self.store.schema().new_document(name));
        }
        self.store.get_or_create_metadata(name).await
    }

    /// Append a timestamped history entry to each record's document.
    ///
    /// Failures are logged; the export itself already happened.
    async fn record_event(&self, names: &[String], category: HistoryCategory) {
        if names.is_empty() || !self.store.config().record_history || self.store.is_legacy() {
            return;
        }
        let label = timestamp_label();
        let appends = names.iter().map(|name| {
            let label = label.clone();
            async move {
                let result = self
                    .store
                    .update(name, move |doc| {
                        let mut history =
                            doc.history_for_update(&ObjectKind::Document.object_name(name))?;
                        history.append(category, label);
                        doc.set_history(&history)?;
                        Ok(true)
                    })
                    .await;
                if let Err(e) = result {
                    warn!(name = %name, %category, error = %e, "Could not record history entry");
                }
            }
        });
        join_all(appends).await;
    }
}

/// Records that had at least one completed item.
fn records_with_completed(results: &[(&String, Vec<ItemReport>)]) -> Vec<String> {
    results
        .iter()
        .filter(|(_, reports)| reports.iter().any(|r| r.outcome == ItemOutcome::Completed))
        .map(|(name, _)| (*name).clone())
        .collect()
}

//! Record store: metadata document lifecycle and record enumeration.
//!
//! A record is not stored anywhere. It exists while its asset, its metadata
//! document, or both exist under the same base name. Documents are created
//! lazily on first read, migrated on every read, and rewritten wholesale on
//! every save.
//!
//! Mutations of one record's document are sequenced through a per-record
//! lock; different records proceed independently.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::config::StoreConfig;
use crate::error::{FieldrecError, Result};
use crate::geodetic::GridSystem;
use crate::report::ItemReport;
use crate::schema::{MetadataDocument, Schema};
use crate::storage::{split_object_name, ObjectKind, StorageProvider};

/// One lock per record base name.
#[derive(Default)]
struct RecordLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RecordLocks {
    async fn acquire(&self, base_name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(base_name.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drop an idle lock after its record is gone.
    fn forget(&self, base_name: &str) {
        self.locks
            .remove_if(base_name, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Which halves of a record exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordPresence {
    pub asset: bool,
    pub document: bool,
}

impl RecordPresence {
    pub fn any(&self) -> bool {
        self.asset || self.document
    }
}

/// Owner-side API over a storage provider.
pub struct RecordStore {
    provider: Arc<dyn StorageProvider>,
    schema: Schema,
    locks: RecordLocks,
}

impl RecordStore {
    pub fn new(provider: Arc<dyn StorageProvider>, config: StoreConfig) -> Self {
        let grid = config.georef_format.grid();
        Self::with_grid(provider, config, grid)
    }

    pub fn with_grid(
        provider: Arc<dyn StorageProvider>,
        config: StoreConfig,
        grid: Arc<dyn GridSystem>,
    ) -> Self {
        Self {
            provider,
            schema: Schema::new(config, grid),
            locks: RecordLocks::default(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        self.schema.config()
    }

    pub fn is_legacy(&self) -> bool {
        self.config().legacy_mode
    }

    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    /// Read a record's document, creating or migrating it as needed.
    ///
    /// Absence is not an error: a document seeded with current defaults is
    /// written and returned.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_or_create_metadata(&self, base_name: &str) -> Result<MetadataDocument> {
        let _guard = self.locks.acquire(base_name).await;
        self.load_or_create(base_name).await
    }

    /// Overwrite a record's document. No merge and no migration.
    #[instrument(level = "debug", skip(self, doc))]
    pub async fn save(&self, base_name: &str, doc: &MetadataDocument) -> Result<()> {
        let _guard = self.locks.acquire(base_name).await;
        self.write_document(base_name, doc).await
    }

    /// Sequenced read-modify-write of a record's document.
    ///
    /// `mutate` returns whether it changed the document; the document is
    /// written once, and only when changed.
    #[instrument(level = "debug", skip(self, mutate))]
    pub async fn update<F>(&self, base_name: &str, mutate: F) -> Result<MetadataDocument>
    where
        F: FnOnce(&mut MetadataDocument) -> Result<bool> + Send,
    {
        let _guard = self.locks.acquire(base_name).await;
        let mut doc = self.load_or_create(base_name).await?;
        if mutate(&mut doc)? {
            self.write_document(base_name, &doc).await?;
        }
        Ok(doc)
    }

    /// Existence check for an object name.
    ///
    /// Provider failures read as "does not exist".
    pub async fn exists(&self, object_name: &str) -> bool {
        match self.provider.exists(object_name).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!(object_name, error = %e, "Existence check failed, treating as absent");
                false
            }
        }
    }

    /// Which halves of a record exist.
    pub async fn presence(&self, base_name: &str) -> RecordPresence {
        let asset_name = ObjectKind::Asset.object_name(base_name);
        let document_name = ObjectKind::Document.object_name(base_name);
        let (asset, document) =
            futures::join!(self.exists(&asset_name), self.exists(&document_name));
        RecordPresence { asset, document }
    }

    /// Read an object's raw bytes.
    pub async fn read_object(&self, object_name: &str) -> Result<Option<Vec<u8>>> {
        self.provider
            .read(object_name)
            .await
            .map_err(FieldrecError::from_provider)
    }

    /// Store a new asset. Existing assets are never rewritten.
    #[instrument(level = "debug", skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn put_asset(&self, base_name: &str, bytes: &[u8]) -> Result<bool> {
        let name = ObjectKind::Asset.object_name(base_name);
        if self.exists(&name).await {
            warn!(name = %name, "Asset already present, leaving it untouched");
            return Ok(false);
        }
        self.provider
            .write(&name, bytes)
            .await
            .map_err(FieldrecError::from_provider)?;
        info!(name = %name, "Stored asset");
        Ok(true)
    }

    /// Best-effort deletion of object names.
    ///
    /// Each name is attempted independently; failures are logged and
    /// reported, never raised. Only an unreachable provider is an error.
    #[instrument(level = "debug", skip(self, names), fields(count = names.len()))]
    pub async fn delete(&self, names: &[String]) -> Result<Vec<ItemReport>> {
        self.provider
            .check_health()
            .await
            .map_err(|e| FieldrecError::StorageUnavailable(e.to_string()))?;

        let unique: Vec<&String> = {
            let mut seen = HashSet::new();
            names.iter().filter(|n| seen.insert(n.as_str())).collect()
        };

        let attempts = unique.into_iter().map(|name| async move {
            let base = split_object_name(name).map(|(_, base)| base).unwrap_or(name.as_str());
            let _guard = self.locks.acquire(base).await;
            match self.provider.delete(name).await {
                Ok(()) => {
                    debug!(name = %name, "Deleted object");
                    ItemReport::completed(name.clone())
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "Could not delete object");
                    ItemReport::failed(name.clone(), e)
                }
            }
        });
        let reports = join_all(attempts).await;

        for report in &reports {
            if let Some((_, base)) = split_object_name(&report.name) {
                self.locks.forget(base);
            }
        }

        info!(
            attempted = reports.len(),
            failed = reports.iter().filter(|r| r.outcome.is_failure()).count(),
            "Delete finished"
        );
        Ok(reports)
    }

    /// Base names of every record in the storage area.
    ///
    /// In legacy mode only assets make records. Otherwise each base name
    /// appears once, whether it has an asset, a document, or both. Order is
    /// not meaningful.
    #[instrument(level = "debug", skip(self))]
    pub async fn enumerate(&self) -> Result<Vec<String>> {
        let objects = self
            .provider
            .list()
            .await
            .map_err(|e| FieldrecError::StorageUnavailable(e.to_string()))?;

        let mut assets = Vec::new();
        let mut documents = Vec::new();
        for object in &objects {
            match split_object_name(object) {
                Some((ObjectKind::Asset, base)) => assets.push(base.to_string()),
                Some((ObjectKind::Document, base)) => documents.push(base.to_string()),
                None => debug!(object = %object, "Ignoring object outside any record"),
            }
        }

        if self.is_legacy() {
            return Ok(assets);
        }

        let mut seen = HashSet::new();
        let records: Vec<String> = documents
            .into_iter()
            .chain(assets)
            .filter(|base| seen.insert(base.clone()))
            .collect();
        debug!(records = records.len(), objects = objects.len(), "Enumerated records");
        Ok(records)
    }

    async fn load_or_create(&self, base_name: &str) -> Result<MetadataDocument> {
        let name = ObjectKind::Document.object_name(base_name);

        let Some(bytes) = self.read_object(&name).await? else {
            let doc = self.schema.new_document(base_name);
            self.write_document(base_name, &doc).await?;
            info!(name = %name, "Created metadata document");
            return Ok(doc);
        };

        let mut doc = MetadataDocument::from_bytes(&name, &bytes)?;
        let added = self.schema.migrate(base_name, &mut doc);
        if added.is_empty() {
            return Ok(doc);
        }

        info!(name = %name, added = ?added, "Migrated metadata document");
        self.write_document(base_name, &doc).await?;

        // Re-read so callers see what the provider actually holds. A provider
        // that still serves the pre-migration bytes is lagging, and the
        // written document stands.
        match self.read_object(&name).await? {
            Some(bytes) => {
                let mut reread = MetadataDocument::from_bytes(&name, &bytes)?;
                if self.schema.migrate(base_name, &mut reread).is_empty() {
                    Ok(reread)
                } else {
                    warn!(name = %name, "Stale read after migration, keeping the written document");
                    Ok(doc)
                }
            }
            None => {
                warn!(name = %name, "Migrated document not readable after write");
                Ok(doc)
            }
        }
    }

    async fn write_document(&self, base_name: &str, doc: &MetadataDocument) -> Result<()> {
        let name = ObjectKind::Document.object_name(base_name);
        let bytes = doc.to_bytes()?;
        self.provider
            .write(&name, &bytes)
            .await
            .map_err(FieldrecError::from_provider)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.provider.backend_name())
            .field("schema", &self.schema)
            .field("locks", &self.locks.len())
            .finish()
    }
}

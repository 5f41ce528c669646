//! In-memory storage provider
//!
//! Used for tests and dry runs. Supports injecting per-object failures so
//! batch isolation can be exercised without a real backend.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{StorageError, StorageProvider};

/// In-memory storage backed by a concurrent map.
#[derive(Default)]
pub struct MemoryStorage {
    objects: DashMap<String, Vec<u8>>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing failure injection.
    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.insert(name.into(), bytes.into());
    }

    /// Make every delete of `name` fail.
    pub fn fail_deletes_of(&self, name: impl Into<String>) {
        if let Ok(mut set) = self.failing_deletes.lock() {
            set.insert(name.into());
        }
    }

    /// Make every write of `name` fail.
    pub fn fail_writes_of(&self, name: impl Into<String>) {
        if let Ok(mut set) = self.failing_writes.lock() {
            set.insert(name.into());
        }
    }

    /// Simulate the whole backend going away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory storage offline".into()))
        } else {
            Ok(())
        }
    }

    fn injected(set: &Mutex<HashSet<String>>, name: &str) -> bool {
        set.lock().map(|s| s.contains(name)).unwrap_or(false)
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn list(&self) -> Result<Vec<String>, StorageError> {
        self.ensure_available()?;
        let mut names: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.ensure_available()?;
        Ok(self.objects.get(name).map(|e| e.value().clone()))
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.ensure_available()?;
        if Self::injected(&self.failing_writes, name) {
            return Err(StorageError::Io {
                name: name.to_string(),
                reason: "injected write failure".into(),
            });
        }
        self.objects.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        if Self::injected(&self.failing_deletes, name) {
            return Err(StorageError::Io {
                name: name.to_string(),
                reason: "injected delete failure".into(),
            });
        }
        match self.objects.remove(name) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(name.to_string())),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        self.ensure_available()?;
        Ok(self.objects.contains_key(name))
    }

    async fn check_health(&self) -> Result<(), StorageError> {
        self.ensure_available()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("objects", &self.objects.len())
            .field("unavailable", &self.unavailable.load(Ordering::SeqCst))
            .finish()
    }
}

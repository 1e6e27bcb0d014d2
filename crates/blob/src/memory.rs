use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use upd_core::{BackendInfo, StorageKind};

use crate::backend::{BlobBackend, validate_key};
use crate::error::BlobError;

#[derive(Debug, Default)]
struct Shared {
    blobs: RwLock<HashMap<(String, String), Bytes>>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

/// In-memory blob backend for tests and ephemeral runs.
///
/// Reports itself as the given medium so it can stand in for either real
/// backend. Relocated handles share the same storage, partitioned by locator.
#[derive(Debug, Clone)]
pub struct MemoryBlobBackend {
    info: BackendInfo,
    shared: Arc<Shared>,
}

impl Default for MemoryBlobBackend {
    fn default() -> Self {
        Self::new(BackendInfo::new(StorageKind::Fs, "memory"))
    }
}

impl MemoryBlobBackend {
    pub fn new(info: BackendInfo) -> Self {
        Self {
            info,
            shared: Arc::default(),
        }
    }

    /// Make subsequent writes fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent deletes fail with a storage error.
    pub fn fail_deletes(&self, fail: bool) {
        self.shared.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Returns `true` if a blob is stored under `id` at this locator.
    pub fn contains(&self, id: &str) -> bool {
        self.shared.blobs.read().contains_key(&self.key(id))
    }

    /// Number of blobs stored at this locator.
    pub fn len(&self) -> usize {
        self.shared
            .blobs
            .read()
            .keys()
            .filter(|(locator, _)| *locator == self.info.locator)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(&self, id: &str) -> (String, String) {
        (self.info.locator.clone(), id.to_owned())
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    fn info(&self) -> BackendInfo {
        self.info.clone()
    }

    async fn write(&self, id: &str, data: Bytes) -> Result<(), BlobError> {
        validate_key(id)?;
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(BlobError::Storage("injected write failure".into()));
        }
        self.shared.blobs.write().insert(self.key(id), data);
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Bytes, BlobError> {
        validate_key(id)?;
        self.shared
            .blobs
            .read()
            .get(&self.key(id))
            .cloned()
            .ok_or_else(|| BlobError::NotFound(id.to_owned()))
    }

    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        validate_key(id)?;
        if self.shared.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Storage("injected delete failure".into()));
        }
        Ok(self.shared.blobs.write().remove(&self.key(id)).is_some())
    }

    fn relocate(&self, locator: &str) -> Result<Arc<dyn BlobBackend>, BlobError> {
        Ok(Arc::new(Self {
            info: BackendInfo::new(self.info.kind, locator),
            shared: Arc::clone(&self.shared),
        }))
    }
}

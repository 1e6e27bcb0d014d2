use std::sync::Arc;

use upd_blob::BlobBackend;
use upd_records::RecordStore;

use crate::allocator::{AllocatorConfig, IdAllocator};
use crate::engine::LifecycleEngine;
use crate::error::EngineError;
use crate::metrics::EngineMetrics;

/// Fluent builder for constructing a [`LifecycleEngine`].
///
/// A [`BlobBackend`] and a [`RecordStore`] must be supplied. Metrics and the
/// allocator configuration have defaults.
#[derive(Default)]
pub struct EngineBuilder {
    blobs: Option<Arc<dyn BlobBackend>>,
    records: Option<Arc<dyn RecordStore>>,
    metrics: Option<Arc<EngineMetrics>>,
    allocator: AllocatorConfig,
    seed: Option<u64>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active blob backend. New blobs are written here.
    #[must_use]
    pub fn blobs(mut self, blobs: Arc<dyn BlobBackend>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Set the record store.
    #[must_use]
    pub fn records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = Some(records);
        self
    }

    /// Share an existing metrics instance instead of creating one.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn allocator_config(mut self, config: AllocatorConfig) -> Self {
        self.allocator = config;
        self
    }

    /// Seed the identifier generator deterministically. Tests only.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Consume the builder and produce a [`LifecycleEngine`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the blob backend or record
    /// store was not provided.
    pub fn build(self) -> Result<LifecycleEngine, EngineError> {
        let blobs = self
            .blobs
            .ok_or_else(|| EngineError::Configuration("a blob backend is required".into()))?;
        let records = self
            .records
            .ok_or_else(|| EngineError::Configuration("a record store is required".into()))?;
        let allocator = match self.seed {
            Some(seed) => IdAllocator::with_seed(self.allocator, seed),
            None => IdAllocator::new(self.allocator),
        };
        Ok(LifecycleEngine::new(
            blobs,
            records,
            allocator,
            self.metrics.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use upd_blob::MemoryBlobBackend;
    use upd_records_memory::MemoryRecordStore;

    use super::*;

    #[test]
    fn requires_blob_backend() {
        let err = EngineBuilder::new()
            .records(Arc::new(MemoryRecordStore::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(msg) if msg.contains("blob backend")));
    }

    #[test]
    fn requires_record_store() {
        let err = EngineBuilder::new()
            .blobs(Arc::new(MemoryBlobBackend::default()))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(msg) if msg.contains("record store")));
    }

    #[test]
    fn shares_supplied_metrics() {
        let metrics = Arc::new(EngineMetrics::default());
        let engine = EngineBuilder::new()
            .blobs(Arc::new(MemoryBlobBackend::default()))
            .records(Arc::new(MemoryRecordStore::new()))
            .metrics(Arc::clone(&metrics))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(engine.metrics(), &metrics));
    }
}

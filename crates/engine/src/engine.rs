use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use subtle::ConstantTimeEq;
use tracing::{debug, info, instrument, warn};
use upd_blob::BlobBackend;
use upd_core::{BackendInfo, Record, expiration_for, sanitize_name};
use upd_records::RecordStore;

use crate::allocator::IdAllocator;
use crate::error::EngineError;
use crate::metrics::EngineMetrics;

/// Outcome of a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub id: String,
    pub delete_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A live record together with its blob contents.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub record: Record,
    pub data: Bytes,
}

/// Summary of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired records found by the scan.
    pub scanned: usize,
    /// Records retired by this sweep.
    pub retired: usize,
    /// Records whose retirement failed; they are retried on the next sweep.
    pub failed: usize,
}

/// Orchestrates ingest, resolution, retirement and expiry over one
/// [`BlobBackend`] and one [`RecordStore`].
///
/// Blobs are always written before their record and deleted before their
/// record, so a crash between the two steps can leave an orphan blob but
/// never a record pointing at nothing.
pub struct LifecycleEngine {
    blobs: Arc<dyn BlobBackend>,
    records: Arc<dyn RecordStore>,
    allocator: IdAllocator,
    metrics: Arc<EngineMetrics>,
    relocated: DashMap<String, Arc<dyn BlobBackend>>,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("backend", &self.blobs.info())
            .field("relocated", &self.relocated.len())
            .finish_non_exhaustive()
    }
}

impl LifecycleEngine {
    pub(crate) fn new(
        blobs: Arc<dyn BlobBackend>,
        records: Arc<dyn RecordStore>,
        allocator: IdAllocator,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            blobs,
            records,
            allocator,
            metrics,
            relocated: DashMap::new(),
        }
    }

    /// Bind the record store to the active storage medium.
    ///
    /// Must be called once at startup. A store created for another medium
    /// fails with [`RecordError::MediumMismatch`](upd_records::RecordError::MediumMismatch).
    pub async fn bind_medium(&self) -> Result<(), EngineError> {
        let medium = self.blobs.info().kind;
        self.records.bind_medium(medium.as_str()).await?;
        info!(medium = %medium, "record store bound to storage medium");
        Ok(())
    }

    /// The medium and locator new blobs are written to.
    pub fn backend_info(&self) -> BackendInfo {
        self.blobs.info()
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Store a new blob and its record.
    ///
    /// Validation happens before anything is written. If the record cannot
    /// be stored, the freshly written blob is removed on a best-effort basis.
    #[instrument(skip(self, data, tags), fields(size = data.len()))]
    pub async fn ingest(
        &self,
        original_name: &str,
        data: Bytes,
        ttl: &str,
        tags: &[String],
    ) -> Result<Ingested, EngineError> {
        let original = sanitize_name(original_name)?;
        let ttl = ttl.trim();
        let created_at = Utc::now();
        let expires_at = expiration_for(created_at, ttl)?;
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        let result = self
            .store_new(original, data, ttl, tags, created_at, expires_at)
            .await;
        match &result {
            Ok(ingested) => {
                self.metrics.increment_ingested();
                info!(id = %ingested.id, "ingested blob");
            }
            Err(e) => {
                self.metrics.increment_ingest_failed();
                warn!(error = %e, "ingest failed");
            }
        }
        result
    }

    async fn store_new(
        &self,
        original: String,
        data: Bytes,
        ttl: &str,
        tags: Vec<String>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Ingested, EngineError> {
        let reservation = self.allocator.reserve(self.records.as_ref()).await?;
        let id = reservation.id().to_owned();
        let delete_token = self.allocator.new_delete_token();

        self.blobs.write(&id, data).await?;

        let record = Record {
            id: id.clone(),
            original,
            tags,
            ttl: ttl.to_owned(),
            expires_at,
            delete_token: delete_token.clone(),
            created_at,
            backend: self.blobs.info(),
        };
        if let Err(e) = self.records.put(&record).await {
            match self.blobs.delete(&id).await {
                Ok(_) => debug!(id = %id, "removed blob after failed record write"),
                Err(cleanup) => {
                    warn!(id = %id, error = %cleanup, "failed to remove orphan blob");
                }
            }
            return Err(e.into());
        }
        drop(reservation);

        Ok(Ingested {
            id,
            delete_token,
            expires_at,
        })
    }

    /// Look up a live record and read its blob.
    ///
    /// An expired record is retired on the spot and reported as not found,
    /// exactly like an absent one.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: &str) -> Result<Resolved, EngineError> {
        let record = self.live_record(id).await?;
        let backend = self.backend_for(&record.backend)?;
        match backend.read(id).await {
            Ok(data) => {
                self.metrics.increment_resolved();
                Ok(Resolved { record, data })
            }
            Err(e) if e.is_not_found() => {
                // A concurrent retirement deletes the blob before the record.
                if self.records.contains(id).await? {
                    Err(e.into())
                } else {
                    Err(EngineError::NotFound)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a record, lazily retiring it if it has expired.
    async fn live_record(&self, id: &str) -> Result<Record, EngineError> {
        let record = self
            .records
            .get(id)
            .await?
            .ok_or(EngineError::NotFound)?;
        if record.is_expired(Utc::now()) {
            match self.retire(&record).await {
                Ok(true) => {
                    self.metrics.increment_expired();
                    debug!(id = %id, "lazily retired expired record");
                }
                Ok(false) => {}
                Err(e) => {
                    self.metrics.increment_retire_failed();
                    warn!(id = %id, error = %e, "lazy retirement failed");
                }
            }
            return Err(EngineError::NotFound);
        }
        Ok(record)
    }

    /// Remove a record's blob, then the record and its recency entry.
    ///
    /// Idempotent: retiring an already-retired record returns `Ok(false)`.
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub async fn retire(&self, record: &Record) -> Result<bool, EngineError> {
        let backend = self.backend_for(&record.backend)?;
        backend.delete(&record.id).await?;
        let removed = self.records.delete(&record.id).await?;
        if removed {
            self.metrics.increment_retired();
        }
        Ok(removed)
    }

    /// Retire a record on behalf of a caller presenting its delete token.
    ///
    /// Returns `Ok(false)` if a concurrent retirement removed the record
    /// first.
    #[instrument(skip(self, presented_token))]
    pub async fn delete(&self, id: &str, presented_token: &str) -> Result<bool, EngineError> {
        let record = self.live_record(id).await?;
        let matches: bool = record
            .delete_token
            .as_bytes()
            .ct_eq(presented_token.as_bytes())
            .into();
        if !matches {
            self.metrics.increment_forbidden();
            return Err(EngineError::Forbidden);
        }
        let removed = self.retire(&record).await?;
        if removed {
            self.metrics.increment_deleted();
            info!(id = %id, "deleted record");
        }
        Ok(removed)
    }

    /// Live records carrying any of `query` tags, newest first.
    ///
    /// Matching is exact and case-sensitive. An empty query matches nothing.
    pub async fn search_by_tag(&self, query: &[String]) -> Result<Vec<Record>, EngineError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let mut hits: Vec<Record> = self
            .records
            .scan_all()
            .await?
            .into_iter()
            .filter(|r| !r.is_expired(now) && r.matches_any_tag(query))
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(hits)
    }

    /// The most recently ingested live records, newest first.
    pub async fn list_recent(&self) -> Result<Vec<Record>, EngineError> {
        let now = Utc::now();
        Ok(self
            .records
            .list_recent()
            .await?
            .into_iter()
            .filter(|r| !r.is_expired(now))
            .collect())
    }

    /// Retire every record whose expiration instant has passed.
    ///
    /// Individual failures are logged and counted; they never abort the
    /// sweep.
    pub async fn sweep_expired(&self) -> Result<SweepReport, EngineError> {
        let expired = self.records.scan_expired(Utc::now()).await?;
        let mut report = SweepReport {
            scanned: expired.len(),
            ..SweepReport::default()
        };
        for record in &expired {
            match self.retire(record).await {
                Ok(true) => {
                    report.retired += 1;
                    self.metrics.increment_expired();
                    debug!(id = %record.id, "retired expired record");
                }
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    self.metrics.increment_retire_failed();
                    warn!(id = %record.id, error = %e, "failed to retire expired record");
                }
            }
        }
        self.metrics.increment_sweeps();
        Ok(report)
    }

    /// The backend that holds blobs written under `info`.
    fn backend_for(&self, info: &BackendInfo) -> Result<Arc<dyn BlobBackend>, EngineError> {
        let active = self.blobs.info();
        if active.kind != info.kind {
            return Err(EngineError::BackendMismatch {
                expected: active.kind,
                found: info.kind,
            });
        }
        if active.locator == info.locator {
            return Ok(Arc::clone(&self.blobs));
        }
        if let Some(backend) = self.relocated.get(&info.locator) {
            return Ok(Arc::clone(backend.value()));
        }
        let backend = self.blobs.relocate(&info.locator)?;
        debug!(locator = %info.locator, "relocated blob backend");
        self.relocated
            .insert(info.locator.clone(), Arc::clone(&backend));
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use upd_blob::MemoryBlobBackend;
    use upd_core::StorageKind;
    use upd_records_memory::MemoryRecordStore;

    use super::*;
    use crate::builder::EngineBuilder;

    fn engine() -> (LifecycleEngine, MemoryBlobBackend, Arc<MemoryRecordStore>) {
        let blobs = MemoryBlobBackend::default();
        let records = Arc::new(MemoryRecordStore::new());
        let engine = EngineBuilder::new()
            .blobs(Arc::new(blobs.clone()))
            .records(Arc::clone(&records) as Arc<dyn RecordStore>)
            .build()
            .unwrap();
        (engine, blobs, records)
    }

    #[tokio::test]
    async fn ingest_writes_blob_and_record() {
        let (engine, blobs, records) = engine();
        let out = engine
            .ingest("notes.txt", Bytes::from_static(b"hi"), "", &[])
            .await
            .unwrap();

        assert!(blobs.contains(&out.id));
        let record = records.get(&out.id).await.unwrap().unwrap();
        assert_eq!(record.original, "notes.txt");
        assert_eq!(record.delete_token, out.delete_token);
        assert_eq!(record.backend, blobs.info());
        assert!(out.expires_at.is_none());
    }

    #[tokio::test]
    async fn ingest_normalizes_name_and_tags() {
        let (engine, _, records) = engine();
        let tags = vec![" a ".to_owned(), String::new(), "b".to_owned()];
        let out = engine
            .ingest("../../etc/passwd", Bytes::from_static(b"x"), " 1h ", &tags)
            .await
            .unwrap();

        let record = records.get(&out.id).await.unwrap().unwrap();
        assert_eq!(record.original, "passwd");
        assert_eq!(record.tags, vec!["a", "b"]);
        assert_eq!(record.ttl, "1h");
        assert!(out.expires_at.is_some());
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing() {
        let (engine, blobs, records) = engine();
        let bad_ttl = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "soon", &[])
            .await
            .unwrap_err();
        assert!(matches!(bad_ttl, EngineError::Validation(_)));

        let bad_name = engine
            .ingest("", Bytes::from_static(b"x"), "", &[])
            .await
            .unwrap_err();
        assert!(matches!(bad_name, EngineError::Validation(_)));

        assert!(blobs.is_empty());
        assert_eq!(records.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_blob_write_stores_no_record() {
        let (engine, blobs, records) = engine();
        blobs.fail_writes(true);
        let err = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Blob(_)));
        assert_eq!(records.count().await.unwrap(), 0);
        assert_eq!(engine.metrics().snapshot().ingest_failed, 1);
    }

    #[tokio::test]
    async fn delete_token_is_checked() {
        let (engine, blobs, _) = engine();
        let out = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "", &[])
            .await
            .unwrap();

        let err = engine.delete(&out.id, "wrong").await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden));
        assert!(blobs.contains(&out.id));

        assert!(engine.delete(&out.id, &out.delete_token).await.unwrap());
        assert!(!blobs.contains(&out.id));
        assert!(engine.resolve(&out.id).await.unwrap_err().is_not_found());

        let snap = engine.metrics().snapshot();
        assert_eq!(snap.forbidden, 1);
        assert_eq!(snap.deleted, 1);
    }

    #[tokio::test]
    async fn retire_is_idempotent() {
        let (engine, _, records) = engine();
        let out = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "", &[])
            .await
            .unwrap();
        let record = records.get(&out.id).await.unwrap().unwrap();

        assert!(engine.retire(&record).await.unwrap());
        assert!(!engine.retire(&record).await.unwrap());
        assert_eq!(engine.metrics().snapshot().retired, 1);
    }

    #[tokio::test]
    async fn failed_blob_delete_keeps_record() {
        let (engine, blobs, records) = engine();
        let out = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "", &[])
            .await
            .unwrap();
        blobs.fail_deletes(true);

        let err = engine.delete(&out.id, &out.delete_token).await.unwrap_err();
        assert!(matches!(err, EngineError::Blob(_)));
        assert!(records.contains(&out.id).await.unwrap());
    }

    #[tokio::test]
    async fn expired_record_is_lazily_retired() {
        let (engine, blobs, records) = engine();
        let out = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "1ms", &[])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(engine.resolve(&out.id).await.unwrap_err().is_not_found());
        assert!(!blobs.contains(&out.id));
        assert!(!records.contains(&out.id).await.unwrap());
        assert_eq!(engine.metrics().snapshot().expired, 1);
    }

    #[tokio::test]
    async fn failed_lazy_retirement_is_counted() {
        let (engine, blobs, records) = engine();
        let out = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "1ms", &[])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        blobs.fail_deletes(true);

        assert!(engine.resolve(&out.id).await.unwrap_err().is_not_found());
        assert!(records.contains(&out.id).await.unwrap());
        let snap = engine.metrics().snapshot();
        assert_eq!(snap.retire_failed, 1);
        assert_eq!(snap.expired, 0);

        let report = engine.sweep_expired().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(engine.metrics().snapshot().retire_failed, 2);

        blobs.fail_deletes(false);
        assert_eq!(engine.sweep_expired().await.unwrap().retired, 1);
        assert!(!records.contains(&out.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_of_expired_record_is_not_found() {
        let (engine, _, _) = engine();
        let out = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "1ms", &[])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = engine.delete(&out.id, &out.delete_token).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn missing_blob_behind_live_record_is_an_error() {
        let (engine, blobs, _) = engine();
        let out = engine
            .ingest("a.txt", Bytes::from_static(b"x"), "", &[])
            .await
            .unwrap();
        blobs.delete(&out.id).await.unwrap();

        let err = engine.resolve(&out.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Blob(_)));
    }

    #[tokio::test]
    async fn sweep_retires_only_expired_records() {
        let (engine, _, records) = engine();
        let keep = engine
            .ingest("keep.txt", Bytes::from_static(b"x"), "", &[])
            .await
            .unwrap();
        let gone = engine
            .ingest("gone.txt", Bytes::from_static(b"x"), "1ms", &[])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let report = engine.sweep_expired().await.unwrap();
        assert_eq!(report.retired, 1);
        assert_eq!(report.failed, 0);
        assert!(records.contains(&keep.id).await.unwrap());
        assert!(!records.contains(&gone.id).await.unwrap());
        assert_eq!(engine.metrics().snapshot().sweeps, 1);
    }

    #[tokio::test]
    async fn record_from_other_medium_is_rejected() {
        let (engine, _, records) = engine();
        let mut record = upd_records::testing::test_record("s3rec");
        record.backend = BackendInfo::new(StorageKind::S3, "bucket");
        records.put(&record).await.unwrap();

        let err = engine.resolve("s3rec").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::BackendMismatch {
                expected: StorageKind::Fs,
                found: StorageKind::S3
            }
        ));
    }

    #[tokio::test]
    async fn record_at_old_locator_is_served_through_relocation() {
        let (engine, blobs, records) = engine();
        let old = blobs.relocate("/old/root").unwrap();
        old.write("moved", Bytes::from_static(b"legacy")).await.unwrap();

        let mut record = upd_records::testing::test_record("moved");
        record.backend = BackendInfo::new(StorageKind::Fs, "/old/root");
        records.put(&record).await.unwrap();

        let resolved = engine.resolve("moved").await.unwrap();
        assert_eq!(resolved.data, Bytes::from_static(b"legacy"));

        assert!(engine.retire(&record).await.unwrap());
        assert!(old.read("moved").await.unwrap_err().is_not_found());
    }
}

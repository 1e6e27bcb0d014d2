use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::RwLock;

use upd_core::Record;
use upd_records::error::RecordError;
use upd_records::store::{RECENT_LIMIT, RecordStore};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Record>,
    recent: VecDeque<String>,
    medium: Option<String>,
}

/// In-memory [`RecordStore`].
///
/// All state sits behind one writer lock, so a put or delete and its
/// recency-index update are a single critical section. Readers clone out a
/// snapshot under the read lock. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

impl MemoryRecordStore {
    /// Create a new, empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn bind_medium(&self, medium: &str) -> Result<(), RecordError> {
        let mut inner = self.inner.write();
        match inner.medium.as_deref() {
            None => {
                inner.medium = Some(medium.to_owned());
                Ok(())
            }
            Some(stored) if stored == medium => Ok(()),
            Some(stored) => Err(RecordError::MediumMismatch {
                stored: stored.to_owned(),
                configured: medium.to_owned(),
            }),
        }
    }

    async fn medium(&self) -> Result<Option<String>, RecordError> {
        Ok(self.inner.read().medium.clone())
    }

    async fn put(&self, record: &Record) -> Result<(), RecordError> {
        let mut inner = self.inner.write();
        if inner.records.contains_key(&record.id) {
            return Err(RecordError::AlreadyExists(record.id.clone()));
        }
        inner.records.insert(record.id.clone(), record.clone());
        inner.recent.push_front(record.id.clone());
        inner.recent.truncate(RECENT_LIMIT);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, RecordError> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    async fn contains(&self, id: &str) -> Result<bool, RecordError> {
        Ok(self.inner.read().records.contains_key(id))
    }

    async fn delete(&self, id: &str) -> Result<bool, RecordError> {
        let mut inner = self.inner.write();
        let existed = inner.records.remove(id).is_some();
        inner.recent.retain(|r| r != id);
        Ok(existed)
    }

    async fn list_recent(&self) -> Result<Vec<Record>, RecordError> {
        let inner = self.inner.read();
        Ok(inner
            .recent
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    async fn scan_all(&self) -> Result<Vec<Record>, RecordError> {
        Ok(self.inner.read().records.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, RecordError> {
        Ok(self.inner.read().records.len())
    }
}

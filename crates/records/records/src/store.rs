use async_trait::async_trait;
use chrono::{DateTime, Utc};
use upd_core::Record;

use crate::error::RecordError;

/// Maximum number of identifiers kept in the recency index.
pub const RECENT_LIMIT: usize = 20;

/// Name of the reserved slot holding the storage medium a store was created
/// for.
pub const MEDIUM_SLOT: &str = "storage_medium";

/// Durable mapping from record identifier to [`Record`], plus a bounded
/// most-recent-first index of identifiers.
///
/// Every method is individually atomic and safe under arbitrary interleaving
/// from concurrent callers. `put` and `delete` update the record and the
/// recency index as one unit of work.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Bind the store to a storage medium, or verify an existing binding.
    ///
    /// The first call on a fresh store persists `medium`. Later calls (in this
    /// or any subsequent process) fail with [`RecordError::MediumMismatch`]
    /// if `medium` differs from the persisted one.
    async fn bind_medium(&self, medium: &str) -> Result<(), RecordError>;

    /// The persisted storage medium, if the store has been bound.
    async fn medium(&self) -> Result<Option<String>, RecordError>;

    /// Insert a new record and prepend its identifier to the recency index,
    /// trimming the index to [`RECENT_LIMIT`].
    ///
    /// Fails with [`RecordError::AlreadyExists`] if the identifier is taken;
    /// records are never overwritten.
    async fn put(&self, record: &Record) -> Result<(), RecordError>;

    /// Point lookup. Returns `None` if absent.
    async fn get(&self, id: &str) -> Result<Option<Record>, RecordError>;

    /// Returns `true` if a record exists under `id`.
    async fn contains(&self, id: &str) -> Result<bool, RecordError> {
        Ok(self.get(id).await?.is_some())
    }

    /// Remove a record and its recency entry. Returns `true` if it existed;
    /// deleting an absent record is not an error.
    async fn delete(&self, id: &str) -> Result<bool, RecordError>;

    /// Up to [`RECENT_LIMIT`] records, most recently inserted first.
    async fn list_recent(&self) -> Result<Vec<Record>, RecordError>;

    /// Every stored record, in no particular order.
    async fn scan_all(&self) -> Result<Vec<Record>, RecordError>;

    /// Records whose expiration instant is before `now`.
    ///
    /// The default implementation filters [`scan_all`](Self::scan_all);
    /// backends with an expiration index should override it.
    async fn scan_expired(&self, now: DateTime<Utc>) -> Result<Vec<Record>, RecordError> {
        Ok(self
            .scan_all()
            .await?
            .into_iter()
            .filter(|r| r.is_expired(now))
            .collect())
    }

    /// Number of stored records.
    async fn count(&self) -> Result<usize, RecordError> {
        Ok(self.scan_all().await?.len())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use upd_core::BackendInfo;

use crate::error::BlobError;

/// A physical medium that stores blobs under their record identifier.
///
/// Implementations hold no state besides their configuration. They never
/// retry: I/O and network errors are surfaced to the caller as-is.
#[async_trait]
pub trait BlobBackend: Send + Sync + std::fmt::Debug {
    /// The medium and locator this backend writes to. Persisted on every
    /// record so the blob can be found again after a configuration change.
    fn info(&self) -> BackendInfo;

    /// Store `data` under `id`, replacing any previous blob.
    async fn write(&self, id: &str, data: Bytes) -> Result<(), BlobError>;

    /// Read the blob stored under `id`.
    ///
    /// Returns [`BlobError::NotFound`] if nothing is stored under `id`.
    async fn read(&self, id: &str) -> Result<Bytes, BlobError>;

    /// Remove the blob stored under `id`. Returns `true` if it existed.
    ///
    /// Deleting an absent blob is not an error.
    async fn delete(&self, id: &str) -> Result<bool, BlobError>;

    /// Build a backend of the same kind pointed at another locator.
    ///
    /// Used to reach blobs written before the locator was reconfigured.
    fn relocate(&self, locator: &str) -> Result<Arc<dyn BlobBackend>, BlobError>;
}

/// Reject keys that could escape a directory or collide with temporary files.
pub fn validate_key(id: &str) -> Result<(), BlobError> {
    if id.is_empty() {
        return Err(BlobError::InvalidKey("key must not be empty".into()));
    }
    if id.starts_with('.') {
        return Err(BlobError::InvalidKey(format!("{id:?} starts with a dot")));
    }
    if id.contains(['/', '\\', '\0']) {
        return Err(BlobError::InvalidKey(format!(
            "{id:?} contains a path separator"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identifiers() {
        assert!(validate_key("aZ09xYwQ").is_ok());
    }

    #[test]
    fn rejects_unsafe_keys() {
        for key in ["", ".", "..", ".hidden", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_key(key), Err(BlobError::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
    }
}

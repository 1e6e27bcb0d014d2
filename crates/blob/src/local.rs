use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};
use upd_core::{BackendInfo, StorageKind};

use crate::backend::{BlobBackend, validate_key};
use crate::error::BlobError;

/// Stores each blob as a file named after its identifier under a root
/// directory.
///
/// Writes go to a hidden temporary file first, are flushed to disk and are
/// renamed into place, so a reader never observes a partially written blob
/// and a committed record never outlives its blob across a power loss.
#[derive(Debug, Clone)]
pub struct LocalBlobBackend {
    root: PathBuf,
}

impl LocalBlobBackend {
    /// Create a backend rooted at `root`. The directory is not touched until
    /// the first operation; use [`open`](Self::open) to create it eagerly.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed and return a backend rooted there.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let backend = Self::new(root);
        tokio::fs::create_dir_all(&backend.root)
            .await
            .map_err(|e| {
                BlobError::Storage(format!(
                    "cannot create {}: {e}",
                    backend.root.display()
                ))
            })?;
        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, BlobError> {
        validate_key(id)?;
        Ok(self.root.join(id))
    }

    fn partial_path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!(".{id}.partial"))
    }
}

fn io_error(action: &str, path: &Path, e: &std::io::Error) -> BlobError {
    BlobError::Storage(format!("{action} {}: {e}", path.display()))
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

/// Persist a rename by syncing the directory entry. Directories cannot be
/// opened for syncing outside unix.
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    if cfg!(unix) {
        tokio::fs::File::open(dir).await?.sync_all().await
    } else {
        Ok(())
    }
}

#[async_trait]
impl BlobBackend for LocalBlobBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo::new(StorageKind::Fs, self.root.to_string_lossy())
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn write(&self, id: &str, data: Bytes) -> Result<(), BlobError> {
        let path = self.path_for(id)?;
        let partial = self.partial_path_for(id);

        if let Err(e) = write_synced(&partial, &data).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                warn!(path = %partial.display(), error = %cleanup, "failed to remove partial blob");
            }
            return Err(io_error("write", &partial, &e));
        }

        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                warn!(path = %partial.display(), error = %cleanup, "failed to remove partial blob");
            }
            return Err(io_error("rename", &path, &e));
        }
        sync_dir(&self.root)
            .await
            .map_err(|e| io_error("sync", &self.root, &e))?;

        debug!(path = %path.display(), "blob written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, id: &str) -> Result<Bytes, BlobError> {
        let path = self.path_for(id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(id.to_owned())),
            Err(e) => Err(io_error("read", &path, &e)),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "blob removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("remove", &path, &e)),
        }
    }

    fn relocate(&self, locator: &str) -> Result<Arc<dyn BlobBackend>, BlobError> {
        if locator.is_empty() {
            return Err(BlobError::InvalidKey("empty directory locator".into()));
        }
        Ok(Arc::new(Self::new(locator)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_reports_root() {
        let backend = LocalBlobBackend::new("/srv/upd/files");
        let info = backend.info();
        assert_eq!(info.kind, StorageKind::Fs);
        assert_eq!(info.locator, "/srv/upd/files");
    }

    #[test]
    fn relocate_points_elsewhere() {
        let backend = LocalBlobBackend::new("/a");
        let moved = backend.relocate("/b").unwrap();
        assert_eq!(moved.info().locator, "/b");
        assert!(backend.relocate("").is_err());
    }
}

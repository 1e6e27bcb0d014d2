//! Construction of the configured blob backend and record store.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use upd_aws::{S3BlobBackend, S3Config};
use upd_blob::{BlobBackend, LocalBlobBackend};
use upd_records::RecordStore;
use upd_records_memory::MemoryRecordStore;
use upd_records_sqlite::{SqliteConfig, SqliteRecordStore};

use crate::config::{RecordsConfig, StorageConfig};
use crate::error::ServerError;

/// Create the blob backend named by `config.backend`.
pub async fn create_blob_backend(
    config: &StorageConfig,
) -> Result<Arc<dyn BlobBackend>, ServerError> {
    match config.backend.as_str() {
        "fs" => {
            let dir = &config.fs.output_dir;
            tokio::fs::create_dir_all(dir).await?;
            // Records persist the locator, so it must not depend on the
            // working directory.
            let root = tokio::fs::canonicalize(dir).await?;
            let backend = LocalBlobBackend::open(root)
                .await
                .map_err(|e| ServerError::Config(format!("cannot open {dir}: {e}")))?;
            info!(root = %backend.root().display(), "using filesystem storage");
            Ok(Arc::new(backend))
        }
        "s3" => {
            let s3 = &config.s3;
            let mut s3_config = S3Config::new(&s3.region, &s3.bucket);
            if let Some(prefix) = s3.prefix.as_deref().filter(|p| !p.is_empty()) {
                s3_config = s3_config.with_prefix(prefix);
            }
            if let Some(endpoint) = &s3.endpoint_url {
                s3_config = s3_config.with_endpoint_url(endpoint);
                s3_config.aws = s3_config.aws.with_force_path_style(true);
            }
            if let (Some(key), Some(secret)) = (&s3.access_key, &s3.access_secret) {
                s3_config = s3_config.with_static_credentials(key, secret);
            }
            let backend = S3BlobBackend::new(s3_config)
                .await
                .map_err(|e| ServerError::Config(format!("cannot set up S3 storage: {e}")))?;
            info!(bucket = %s3.bucket, region = %s3.region, "using S3 storage");
            Ok(Arc::new(backend))
        }
        other => Err(ServerError::Config(format!(
            "unknown storage backend: {other}"
        ))),
    }
}

/// Create the record store named by `config.backend`.
pub async fn create_record_store(
    config: &RecordsConfig,
) -> Result<Arc<dyn RecordStore>, ServerError> {
    match config.backend.as_str() {
        "sqlite" => {
            let sqlite_config = SqliteConfig {
                pool_size: config.pool_size,
                busy_timeout: Duration::from_secs(5),
                ..SqliteConfig::new(&config.path)
            };
            let store = SqliteRecordStore::open(sqlite_config)
                .await
                .map_err(|e| ServerError::Config(format!("cannot open {}: {e}", config.path)))?;
            info!(path = %config.path, "using sqlite record store");
            Ok(Arc::new(store))
        }
        "memory" => {
            tracing::warn!("using in-memory record store, records are lost on restart");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        other => Err(ServerError::Config(format!(
            "unknown records backend: {other}"
        ))),
    }
}

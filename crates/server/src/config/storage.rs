use std::fmt;

use serde::Deserialize;

/// Which blob backend stores uploaded files, and its parameters.
///
/// # Example
///
/// ```toml
/// [storage]
/// backend = "s3"
///
/// [storage.s3]
/// region = "eu-west-1"
/// bucket = "upd-files"
/// ```
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// `"fs"` or `"s3"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Local filesystem backend settings.
    #[serde(default)]
    pub fs: FsStorageConfig,
    /// S3 backend settings.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            fs: FsStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

fn default_backend() -> String {
    "fs".to_owned()
}

#[derive(Debug, Deserialize)]
pub struct FsStorageConfig {
    /// Directory files are written to. Created if missing.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for FsStorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "files".to_owned()
}

#[derive(Default, Deserialize)]
pub struct S3StorageConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub bucket: String,
    /// Static access key. When unset, the default AWS credential chain is
    /// used.
    pub access_key: Option<String>,
    pub access_secret: Option<String>,
    /// Endpoint override for S3-compatible stores (`MinIO`, `LocalStack`).
    pub endpoint_url: Option<String>,
    /// Key prefix applied to every object.
    pub prefix: Option<String>,
}

impl fmt::Debug for S3StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3StorageConfig")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field(
                "access_secret",
                &self.access_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .field("prefix", &self.prefix)
            .finish()
    }
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

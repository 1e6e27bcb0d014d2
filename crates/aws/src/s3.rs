use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use upd_blob::{BlobBackend, BlobError, validate_key};
use upd_core::{BackendInfo, StorageKind};

use crate::auth::build_s3_client;
use crate::config::AwsBaseConfig;
use crate::error::{AwsError, classify_sdk_error};

/// Configuration for the S3 blob backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Shared AWS configuration (region, credentials, endpoint URL).
    #[serde(flatten)]
    pub aws: AwsBaseConfig,

    /// Bucket every blob is written to.
    pub bucket: String,

    /// Key prefix for all objects (e.g. `"upd/"`).
    #[serde(default)]
    pub prefix: Option<String>,
}

impl S3Config {
    /// Create a new `S3Config` for `bucket` in `region`.
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            aws: AwsBaseConfig::new(region),
            bucket: bucket.into(),
            prefix: None,
        }
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the endpoint URL override.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.aws.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use static credentials.
    #[must_use]
    pub fn with_static_credentials(
        mut self,
        access_key: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        self.aws = self.aws.with_static_credentials(access_key, access_secret);
        self
    }

    /// The locator persisted on records: the bucket, followed by `/prefix`
    /// when a prefix is configured.
    pub fn locator(&self) -> String {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{}/{prefix}", self.bucket),
            _ => self.bucket.clone(),
        }
    }

    /// Inverse of [`locator`](Self::locator): a copy of this config pointed at
    /// the bucket and prefix `locator` names.
    pub fn at_locator(&self, locator: &str) -> Result<Self, AwsError> {
        let (bucket, prefix) = match locator.split_once('/') {
            Some((bucket, prefix)) => (bucket, Some(prefix.to_owned())),
            None => (locator, None),
        };
        if bucket.is_empty() {
            return Err(AwsError::Configuration(format!(
                "locator {locator:?} names no bucket"
            )));
        }
        Ok(Self {
            aws: self.aws.clone(),
            bucket: bucket.to_owned(),
            prefix: prefix.filter(|p| !p.is_empty()),
        })
    }

    fn validate(&self) -> Result<(), AwsError> {
        if self.bucket.is_empty() {
            return Err(AwsError::Configuration("S3 bucket must be set".into()));
        }
        if self.aws.region.is_empty() {
            return Err(AwsError::Configuration("S3 region must be set".into()));
        }
        Ok(())
    }
}

/// Blob backend storing each blob as one object in an S3 bucket.
#[derive(Clone)]
pub struct S3BlobBackend {
    config: S3Config,
    client: aws_sdk_s3::Client,
}

impl std::fmt::Debug for S3BlobBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobBackend")
            .field("config", &self.config)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3BlobBackend {
    /// Create a new `S3BlobBackend` by building an AWS SDK client.
    pub async fn new(config: S3Config) -> Result<Self, AwsError> {
        config.validate()?;
        let client = build_s3_client(&config.aws).await;
        info!(bucket = %config.bucket, region = %config.aws.region, "S3 blob backend ready");
        Ok(Self { config, client })
    }

    /// Create an `S3BlobBackend` with a pre-built client.
    pub fn with_client(config: S3Config, client: aws_sdk_s3::Client) -> Result<Self, AwsError> {
        config.validate()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Apply the configured prefix to a key.
    fn object_key(&self, id: &str) -> Result<String, BlobError> {
        validate_key(id)?;
        Ok(match &self.config.prefix {
            Some(prefix) => format!("{prefix}{id}"),
            None => id.to_owned(),
        })
    }
}

fn sdk_failure<E>(operation: &str, e: &E) -> BlobError
where
    E: std::error::Error,
{
    let err_str = DisplayErrorContext(e).to_string();
    error!(error = %err_str, operation, "S3 request failed");
    classify_sdk_error(&err_str).into()
}

#[async_trait]
impl BlobBackend for S3BlobBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo::new(StorageKind::S3, self.config.locator())
    }

    #[instrument(skip(self, data), fields(bucket = %self.config.bucket, size = data.len()))]
    async fn write(&self, id: &str, data: Bytes) -> Result<(), BlobError> {
        let key = self.object_key(id)?;
        debug!(key = %key, "uploading object to S3");

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_length(i64::try_from(data.len()).unwrap_or(i64::MAX))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| sdk_failure("put_object", &e))?;

        debug!(key = %key, "S3 object uploaded");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn read(&self, id: &str) -> Result<Bytes, BlobError> {
        let key = self.object_key(id)?;

        let result = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    BlobError::NotFound(id.to_owned())
                } else {
                    sdk_failure("get_object", &e)
                }
            })?;

        let data = result
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Connection(format!("failed to read S3 body: {e}")))?
            .into_bytes();

        debug!(key = %key, size = data.len(), "S3 object downloaded");
        Ok(data)
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        let key = self.object_key(id)?;

        // DeleteObject succeeds on missing keys, so probe first to report
        // whether anything was removed.
        let head = self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await;
        if let Err(e) = head {
            if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                return Ok(false);
            }
            return Err(sdk_failure("head_object", &e));
        }

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| sdk_failure("delete_object", &e))?;

        debug!(key = %key, "S3 object deleted");
        Ok(true)
    }

    fn relocate(&self, locator: &str) -> Result<Arc<dyn BlobBackend>, BlobError> {
        let config = self.config.at_locator(locator)?;
        Ok(Arc::new(Self {
            config,
            client: self.client.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> aws_sdk_s3::Client {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                "AKIA", "secret", None, None, "test",
            ))
            .build();
        aws_sdk_s3::Client::from_conf(conf)
    }

    #[test]
    fn locator_includes_prefix() {
        let config = S3Config::new("us-east-1", "uploads");
        assert_eq!(config.locator(), "uploads");
        let config = config.with_prefix("upd/files/");
        assert_eq!(config.locator(), "uploads/upd/files/");
    }

    #[test]
    fn at_locator_inverts_locator() {
        let config = S3Config::new("us-east-1", "uploads").with_prefix("a/");
        let moved = config.at_locator("archive/b/").unwrap();
        assert_eq!(moved.bucket, "archive");
        assert_eq!(moved.prefix.as_deref(), Some("b/"));
        assert_eq!(moved.locator(), "archive/b/");

        let bare = config.at_locator("plain").unwrap();
        assert_eq!(bare.bucket, "plain");
        assert!(bare.prefix.is_none());

        assert!(config.at_locator("/nobucket").is_err());
    }

    #[test]
    fn empty_bucket_is_rejected() {
        let config = S3Config::new("us-east-1", "");
        assert!(matches!(
            S3BlobBackend::with_client(config, offline_client()),
            Err(AwsError::Configuration(_))
        ));
    }

    #[test]
    fn info_and_relocate() {
        let backend =
            S3BlobBackend::with_client(S3Config::new("us-east-1", "uploads"), offline_client())
                .unwrap();
        let info = backend.info();
        assert_eq!(info.kind, StorageKind::S3);
        assert_eq!(info.locator, "uploads");

        let moved = backend.relocate("old-bucket").unwrap();
        assert_eq!(moved.info().locator, "old-bucket");
        assert_eq!(moved.info().kind, StorageKind::S3);
    }

    #[test]
    fn object_key_applies_prefix_and_validates() {
        let backend = S3BlobBackend::with_client(
            S3Config::new("us-east-1", "uploads").with_prefix("upd/"),
            offline_client(),
        )
        .unwrap();
        assert_eq!(backend.object_key("abc").unwrap(), "upd/abc");
        assert!(backend.object_key("../abc").is_err());
    }

    #[test]
    fn config_deserializes_flattened() {
        let config: S3Config = serde_json::from_str(
            r#"{"region": "eu-west-3", "bucket": "files", "access_key": "AK", "access_secret": "SK"}"#,
        )
        .unwrap();
        assert_eq!(config.aws.region, "eu-west-3");
        assert_eq!(config.bucket, "files");
        assert_eq!(config.aws.static_credentials(), Some(("AK", "SK")));
    }
}

//! Remote object store backend for upd.
//!
//! Blobs are stored as objects in a single S3 (or S3-compatible) bucket,
//! keyed by record identifier with an optional prefix. Credentials are either
//! static (configured access key and secret) or resolved through the standard
//! AWS environment chain.

pub mod auth;
pub mod config;
pub mod error;
pub mod s3;

pub use config::AwsBaseConfig;
pub use error::AwsError;
pub use s3::{S3BlobBackend, S3Config};

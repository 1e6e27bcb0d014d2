use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The physical medium a blob was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum StorageKind {
    /// Files under a local directory.
    Fs,
    /// Objects in a remote S3-compatible bucket.
    S3,
}

impl StorageKind {
    /// Stable identifier persisted in the record store's medium slot.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fs => "fs",
            Self::S3 => "s3",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fs" => Ok(Self::Fs),
            "s3" => Ok(Self::S3),
            other => Err(ValidationError::UnknownStorageKind(other.to_owned())),
        }
    }
}

/// Where a blob lives: the medium plus a backend-specific locator (the root
/// directory for `fs`, the bucket and prefix for `s3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BackendInfo {
    pub kind: StorageKind,
    pub locator: String,
}

impl BackendInfo {
    pub fn new(kind: StorageKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
        }
    }
}

impl fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.locator)
    }
}

/// The durable metadata entry describing one stored blob.
///
/// Records are written once at ingest and never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Public identifier; also the blob's key in its backend.
    pub id: String,
    /// Sanitized user-supplied filename. Informational only.
    pub original: String,
    /// Free-form tags in upload order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The TTL as supplied by the uploader; empty when the record never expires.
    #[serde(default)]
    pub ttl: String,
    /// `created_at + ttl`, or `None` when the record never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Capability required to delete the record.
    pub delete_token: String,
    pub created_at: DateTime<Utc>,
    pub backend: BackendInfo,
}

impl Record {
    /// Returns `true` once `now` is past the expiration instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Returns `true` if any of the record's tags equals any query tag.
    pub fn matches_any_tag(&self, query: &[String]) -> bool {
        self.tags.iter().any(|t| query.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn sample(expires_at: Option<DateTime<Utc>>) -> Record {
        Record {
            id: "aB3dE6gH".into(),
            original: "cat.png".into(),
            tags: vec!["pets".into(), "Cute".into()],
            ttl: String::new(),
            expires_at,
            delete_token: "0123456789abcdef".into(),
            created_at: Utc::now(),
            backend: BackendInfo::new(StorageKind::Fs, "/var/lib/upd/files"),
        }
    }

    #[test]
    fn storage_kind_strings() {
        assert_eq!(StorageKind::Fs.as_str(), "fs");
        assert_eq!("s3".parse::<StorageKind>().unwrap(), StorageKind::S3);
        assert!("ftp".parse::<StorageKind>().is_err());
        assert_eq!(serde_json::to_string(&StorageKind::S3).unwrap(), "\"s3\"");
    }

    #[test]
    fn never_expiring_record() {
        let record = sample(None);
        assert!(!record.is_expired(Utc::now() + TimeDelta::days(3650)));
    }

    #[test]
    fn expiring_record() {
        let now = Utc::now();
        let record = sample(Some(now));
        assert!(!record.is_expired(now - TimeDelta::seconds(1)));
        assert!(record.is_expired(now + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn tag_match_is_exact_and_case_sensitive() {
        let record = sample(None);
        assert!(record.matches_any_tag(&["pets".into()]));
        assert!(record.matches_any_tag(&["nope".into(), "Cute".into()]));
        assert!(!record.matches_any_tag(&["cute".into()]));
        assert!(!record.matches_any_tag(&["pet".into()]));
        assert!(!record.matches_any_tag(&[]));
    }

    #[test]
    fn record_tolerates_missing_optional_fields() {
        let json = r#"{
            "id": "abc",
            "original": "a.txt",
            "expires_at": null,
            "delete_token": "t",
            "created_at": "2024-01-01T00:00:00Z",
            "backend": {"kind": "fs", "locator": "/tmp"}
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert!(record.tags.is_empty());
        assert!(record.ttl.is_empty());
    }
}

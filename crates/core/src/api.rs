//! Wire types exchanged between the server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Response to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendResponse {
    /// The public identifier of the stored file.
    pub name: String,
    /// Token required to delete the file.
    pub delete_key: String,
    /// When the file expires, or `null` if it never does.
    pub expiration_time: Option<DateTime<Utc>>,
}

/// One entry of the recently-uploaded listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecentEntry {
    pub name: String,
    pub original: String,
    pub delete_key: String,
    pub creation_time: DateTime<Utc>,
}

impl From<&Record> for RecentEntry {
    fn from(record: &Record) -> Self {
        Self {
            name: record.id.clone(),
            original: record.original.clone(),
            delete_key: record.delete_token.clone(),
            creation_time: record.created_at,
        }
    }
}

/// One tag-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchEntry {
    pub filename: String,
    pub original: String,
    pub delete_key: String,
    pub creation_time: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl From<&Record> for SearchEntry {
    fn from(record: &Record) -> Self {
        Self {
            filename: record.id.clone(),
            original: record.original.clone(),
            delete_key: record.delete_token.clone(),
            creation_time: record.created_at,
            expiration_time: record.expires_at,
            tags: record.tags.clone(),
        }
    }
}

/// Response body for a tag search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchTagsResponse {
    pub results: Vec<SearchEntry>,
}

/// Result of a credentials check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthStatus {
    /// `"ok"` or `"invalid_credentials"`.
    pub auth_status: String,
}

impl AuthStatus {
    pub fn ok() -> Self {
        Self {
            auth_status: "ok".into(),
        }
    }

    pub fn invalid_credentials() -> Self {
        Self {
            auth_status: "invalid_credentials".into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.auth_status == "ok"
    }
}

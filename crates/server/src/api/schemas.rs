use serde::{Deserialize, Serialize};
use upd_core::BackendInfo;
use upd_engine::MetricsSnapshot;
use utoipa::{IntoParams, ToSchema};

use crate::error::ServerError;
use crate::media::MAX_THUMBNAIL_SIDE;

/// Multipart body of an upload.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SendForm {
    /// The file contents.
    #[schema(value_type = String, format = Binary)]
    pub data: Vec<u8>,
    /// Original filename.
    pub name: Option<String>,
    /// Lifetime such as `30m` or `2h45m`; omitted means forever.
    pub ttl: Option<String>,
    /// Comma-separated tags.
    pub tags: Option<String>,
}

/// Optional thumbnail size for `GET /{id}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ServeQuery {
    /// Target width in pixels.
    pub w: Option<String>,
    /// Target height in pixels.
    pub h: Option<String>,
}

impl ServeQuery {
    /// The requested size, when both dimensions are present.
    ///
    /// Each side must be at most [`MAX_THUMBNAIL_SIDE`].
    pub fn dimensions(&self) -> Result<Option<(u32, u32)>, ServerError> {
        match (self.w.as_deref(), self.h.as_deref()) {
            (Some(w), Some(h)) if !w.is_empty() && !h.is_empty() => {
                let parse = |v: &str| match v.parse::<u32>() {
                    Ok(n) if n <= MAX_THUMBNAIL_SIDE => Ok(n),
                    Ok(_) => Err(ServerError::BadRequest(format!(
                        "dimension {v} exceeds {MAX_THUMBNAIL_SIDE}"
                    ))),
                    Err(_) => Err(ServerError::BadRequest(format!("invalid dimension {v:?}"))),
                };
                Ok(Some((parse(w)?, parse(h)?)))
            }
            _ => Ok(None),
        }
    }
}

/// Query of `GET /1.0/search_tags`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Comma-separated tags; a file matching any of them is returned.
    pub tags: Option<String>,
}

/// Lifecycle counters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricsResponse {
    pub ingested: u64,
    pub ingest_failed: u64,
    pub resolved: u64,
    pub retired: u64,
    pub expired: u64,
    pub deleted: u64,
    pub forbidden: u64,
    pub sweeps: u64,
    pub retire_failed: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            ingested: s.ingested,
            ingest_failed: s.ingest_failed,
            resolved: s.resolved,
            retired: s.retired,
            expired: s.expired,
            deleted: s.deleted,
            forbidden: s.forbidden,
            sweeps: s.sweeps,
            retire_failed: s.retire_failed,
        }
    }
}

/// Response body of `GET /health`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Where new files are stored.
    pub storage: BackendInfo,
    pub metrics: MetricsResponse,
}

/// Error body returned by every failing route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

use thiserror::Error;
use upd_core::{StorageKind, ValidationError};

/// Errors returned by the lifecycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A caller-supplied parameter was rejected before anything was written.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The identifier is absent, retired or expired. Deliberately carries no
    /// detail so the three cases are indistinguishable.
    #[error("not found")]
    NotFound,

    /// The presented delete token does not match.
    #[error("forbidden")]
    Forbidden,

    /// No free identifier was found within the retry budget.
    #[error("identifier namespace exhausted after {attempts} attempts")]
    NamespaceExhausted { attempts: u32 },

    /// A record names a storage medium other than the active one.
    #[error("record stored on {found}, active backend is {expected}")]
    BackendMismatch {
        expected: StorageKind,
        found: StorageKind,
    },

    /// An error from the blob backend.
    #[error("blob error: {0}")]
    Blob(#[from] upd_blob::BlobError),

    /// An error from the record store.
    #[error("record store error: {0}")]
    Records(#[from] upd_records::RecordError),

    /// The engine was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

use thiserror::Error;

/// Errors that can occur during blob backend operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The key is not usable as a blob name on this backend.
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// The backend could not be reached.
    #[error("blob backend connection error: {0}")]
    Connection(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

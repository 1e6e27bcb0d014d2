use thiserror::Error;

/// Errors from record store operations.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// The store was initialized for another storage medium.
    #[error("storage medium mismatch: store was created for {stored:?}, configured {configured:?}")]
    MediumMismatch { stored: String, configured: String },

    /// The durable store exists but cannot be trusted.
    #[error("record store is corrupt: {0}")]
    Corrupt(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl RecordError {
    /// Errors that must stop the process at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MediumMismatch { .. } | Self::Corrupt(_))
    }
}

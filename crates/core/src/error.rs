use thiserror::Error;

/// Errors raised while validating caller-supplied upload parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The TTL string is not a valid duration.
    #[error("invalid ttl {input:?}: {reason}")]
    InvalidTtl {
        /// The rejected input.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The original filename is empty or reduces to nothing usable.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// An unrecognized storage medium identifier.
    #[error("unknown storage kind: {0}")]
    UnknownStorageKind(String),
}

use thiserror::Error;

/// Errors returned by [`UpdClient`](crate::UpdClient).
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the response not received.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body was not what the API promises.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// The HTTP status, for [`Error::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}

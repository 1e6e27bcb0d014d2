use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use upd_engine::EngineError;

/// Errors that can occur when running the upd server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS material could not be loaded.
    #[error("tls error: {0}")]
    Tls(String),

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An error from the lifecycle engine.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Engine(e) => match e {
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::NotFound => StatusCode::NOT_FOUND,
                EngineError::Forbidden => StatusCode::FORBIDDEN,
                EngineError::NamespaceExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_) | Self::Io(_) | Self::Tls(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use upd_core::ValidationError;

    use super::*;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (
                ServerError::Engine(EngineError::Validation(ValidationError::InvalidName(
                    String::new(),
                ))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::Engine(EngineError::NotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::Engine(EngineError::Forbidden),
                StatusCode::FORBIDDEN,
            ),
            (
                ServerError::Engine(EngineError::NamespaceExhausted { attempts: 32 }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServerError::BadRequest("no data".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::Config("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let response = ServerError::Config("/secret/path unreadable".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal server error");
    }
}

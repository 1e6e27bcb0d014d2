//! Shared-secret gate for the upload and listing routes.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use upd_core::AuthStatus;

/// Header carrying the shared secret.
pub const SECRET_KEY_HEADER: &str = "X-upd-key";

/// The static secret clients must present. An empty secret admits everyone.
#[derive(Clone)]
pub struct SharedSecret(Arc<str>);

impl SharedSecret {
    pub fn new(secret: &str) -> Self {
        Self(Arc::from(secret))
    }

    pub fn is_disabled(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare `presented` against the secret in constant time.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        if self.is_disabled() {
            return true;
        }
        presented.is_some_and(|p| bool::from(p.as_bytes().ct_eq(self.0.as_bytes())))
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSecret")
            .field(&if self.is_disabled() { "disabled" } else { "[REDACTED]" })
            .finish()
    }
}

/// Tower layer that gates requests behind the shared secret.
#[derive(Clone)]
pub struct SecretLayer {
    secret: SharedSecret,
}

impl SecretLayer {
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }
}

impl<S> Layer<S> for SecretLayer {
    type Service = SecretMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecretMiddleware {
            inner,
            secret: self.secret.clone(),
        }
    }
}

/// Tower service rejecting requests without the shared secret with `403`.
#[derive(Clone)]
pub struct SecretMiddleware<S> {
    inner: S,
    secret: SharedSecret,
}

impl<S> Service<Request<Body>> for SecretMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let presented = req
            .headers()
            .get(SECRET_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if !self.secret.verify(presented) {
            tracing::debug!(path = %req.uri().path(), "rejected request with invalid secret");
            return Box::pin(async { Ok(forbidden()) });
        }

        // Take the service that was driven to readiness, leave a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(req).await })
    }
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(AuthStatus::invalid_credentials())).into_response()
}

pub mod files;
pub mod health;
pub mod listing;
pub mod openapi;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use upd_engine::LifecycleEngine;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{SecretLayer, SharedSecret};

use self::openapi::ApiDoc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    /// Secret required by the upload and listing routes.
    pub secret: SharedSecret,
    /// Prefix every route is mounted under; empty for the root.
    pub route_prefix: String,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State with no route prefix, no secret and a 100 MiB body limit.
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        Self {
            engine,
            secret: SharedSecret::new(""),
            route_prefix: String::new(),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Build the Axum router with all routes, middleware, and Swagger UI.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/1.0/send", post(files::send))
        .route("/1.0/list", get(listing::list))
        .route("/1.0/search_tags", get(listing::search_tags))
        .route("/1.0/auth_check", get(listing::auth_check))
        .route_layer(SecretLayer::new(state.secret.clone()));

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/{id}", get(files::serve))
        .route(
            "/{id}/{delete_key}",
            get(files::delete).delete(files::delete),
        );

    let api = Router::new()
        .merge(protected)
        .merge(public)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let prefix = state.route_prefix.clone();
    let limit = state.max_upload_bytes;
    let api = api.with_state(state);
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    app.layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-upd-key"),
        ])
}

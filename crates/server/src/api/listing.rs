use axum::Json;
use axum::extract::{Query, State};
use upd_core::{AuthStatus, RecentEntry, SearchEntry, SearchTagsResponse, parse_tags};

use super::AppState;
use super::schemas::SearchQuery;
use crate::error::ServerError;

/// `GET /1.0/list` -- the most recent uploads.
#[utoipa::path(
    get,
    path = "/1.0/list",
    tag = "Listing",
    summary = "Recent uploads",
    description = "Up to 20 live files, most recently uploaded first.",
    responses(
        (status = 200, description = "Recent uploads", body = Vec<RecentEntry>),
        (status = 403, description = "Invalid secret key", body = AuthStatus)
    ),
    security(("upd_key" = []))
)]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<RecentEntry>>, ServerError> {
    let records = state.engine.list_recent().await?;
    Ok(Json(records.iter().map(RecentEntry::from).collect()))
}

/// `GET /1.0/search_tags` -- files carrying any of the given tags.
#[utoipa::path(
    get,
    path = "/1.0/search_tags",
    tag = "Listing",
    summary = "Search by tag",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching files", body = SearchTagsResponse),
        (status = 400, description = "No tags given"),
        (status = 403, description = "Invalid secret key", body = AuthStatus)
    ),
    security(("upd_key" = []))
)]
pub async fn search_tags(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchTagsResponse>, ServerError> {
    let tags = query.tags.as_deref().map(parse_tags).unwrap_or_default();
    if tags.is_empty() {
        return Err(ServerError::BadRequest("missing parameter `tags`".into()));
    }
    let records = state.engine.search_by_tag(&tags).await?;
    Ok(Json(SearchTagsResponse {
        results: records.iter().map(SearchEntry::from).collect(),
    }))
}

/// `GET /1.0/auth_check` -- validate the presented secret.
///
/// Rejections are produced by the auth middleware, so reaching the handler
/// means the secret is valid.
#[utoipa::path(
    get,
    path = "/1.0/auth_check",
    tag = "Listing",
    summary = "Check credentials",
    responses(
        (status = 200, description = "Valid secret", body = AuthStatus),
        (status = 403, description = "Invalid secret", body = AuthStatus)
    ),
    security(("upd_key" = []))
)]
pub async fn auth_check() -> Json<AuthStatus> {
    Json(AuthStatus::ok())
}

#![allow(clippy::needless_for_each)]

use upd_core::{
    AuthStatus, BackendInfo, RecentEntry, SearchEntry, SearchTagsResponse, SendResponse,
    StorageKind,
};
use utoipa::Modify;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use super::schemas::{ErrorResponse, HealthResponse, MetricsResponse, SendForm};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "upd API",
        version = "0.1.0",
        description = "Upload, list, search, serve and delete ephemeral files."
    ),
    tags(
        (name = "Files", description = "Upload, download and deletion"),
        (name = "Listing", description = "Recent uploads, tag search and credential checks"),
        (name = "Health", description = "Service health and counters")
    ),
    paths(
        super::files::send,
        super::files::serve,
        super::files::delete,
        super::listing::list,
        super::listing::search_tags,
        super::listing::auth_check,
        super::health::health,
    ),
    components(schemas(
        SendForm,
        SendResponse,
        RecentEntry,
        SearchEntry,
        SearchTagsResponse,
        AuthStatus,
        BackendInfo,
        StorageKind,
        HealthResponse,
        MetricsResponse,
        ErrorResponse,
    )),
    modifiers(&SecretKeyAddon)
)]
pub struct ApiDoc;

struct SecretKeyAddon;

impl Modify for SecretKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "upd_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-upd-key"))),
        );
    }
}

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::IntoResponse;
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use upd_core::{SendResponse, parse_tags};
use upd_engine::EngineError;

use super::AppState;
use super::schemas::{SendForm, ServeQuery};
use crate::error::ServerError;
use crate::media::{sniff_content_type, thumbnail};

/// `X-Upd-Orig-Filename`: the uploader-supplied filename.
pub const ORIGINAL_FILENAME_HEADER: HeaderName = HeaderName::from_static("x-upd-orig-filename");

/// RFC 5987 `attr-char`: everything else is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Upload parameters that may also be passed in the query string. A multipart
/// field of the same name overrides them.
#[derive(Debug, Default, Deserialize)]
pub struct SendQuery {
    pub name: Option<String>,
    pub ttl: Option<String>,
    pub tags: Option<String>,
}

/// `POST /1.0/send` -- store an uploaded file.
#[utoipa::path(
    post,
    path = "/1.0/send",
    tag = "Files",
    summary = "Upload a file",
    request_body(content = SendForm, content_type = "multipart/form-data"),
    params(
        ("name" = Option<String>, Query, description = "Original filename, if not sent as a form field"),
        ("ttl" = Option<String>, Query, description = "Lifetime such as `30m` or `2h45m`"),
        ("tags" = Option<String>, Query, description = "Comma-separated tags"),
    ),
    responses(
        (status = 200, description = "File stored", body = SendResponse),
        (status = 400, description = "Missing data or name, or invalid TTL"),
        (status = 403, description = "Invalid secret key")
    ),
    security(("upd_key" = []))
)]
pub async fn send(
    State(state): State<AppState>,
    Query(query): Query<SendQuery>,
    mut multipart: Multipart,
) -> Result<Json<SendResponse>, ServerError> {
    let SendQuery {
        mut name,
        mut ttl,
        mut tags,
    } = query;
    let mut data: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            "data" => {
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ServerError::BadRequest(e.body_text()))?,
                );
            }
            "name" | "ttl" | "tags" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                // Form fields take precedence over the query string.
                let slot = match field_name.as_str() {
                    "name" => &mut name,
                    "ttl" => &mut ttl,
                    _ => &mut tags,
                };
                *slot = Some(value);
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ServerError::BadRequest("missing multipart field `data`".into()))?;
    let name = name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ServerError::BadRequest("missing parameter `name`".into()))?;
    let tags = tags.as_deref().map(parse_tags).unwrap_or_default();

    let ingested = state
        .engine
        .ingest(&name, data, ttl.as_deref().unwrap_or_default(), &tags)
        .await?;

    Ok(Json(SendResponse {
        name: ingested.id,
        delete_key: ingested.delete_token,
        expiration_time: ingested.expires_at,
    }))
}

/// `GET /{id}` -- serve a stored file.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Files",
    summary = "Download a file",
    description = "Serves the file bytes. When both `w` and `h` are given, PNG and JPEG images are resized.",
    params(("id" = String, Path, description = "File identifier"), ServeQuery),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Non-numeric or out-of-range width or height"),
        (status = 404, description = "Unknown or expired file")
    )
)]
pub async fn serve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ServeQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let size = query.dimensions()?;
    let resolved = state.engine.resolve(&id).await?;

    let content_type = sniff_content_type(&resolved.data);
    let data = match size {
        Some((w, h)) => {
            let id = id.clone();
            tokio::task::spawn_blocking(move || thumbnail(&id, content_type, resolved.data, w, h))
                .await
                .map_err(|e| ServerError::Io(std::io::Error::other(e)))?
        }
        None => resolved.data,
    };

    let original = &resolved.record.original;
    let encoded = utf8_percent_encode(original, ATTR_CHAR).to_string();
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        ORIGINAL_FILENAME_HEADER,
        HeaderValue::from_str(original)
            .or_else(|_| HeaderValue::from_str(&encoded))
            .map_err(|e| ServerError::BadRequest(e.to_string()))?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("inline; filename*=UTF-8''{encoded}"))
            .map_err(|e| ServerError::BadRequest(e.to_string()))?,
    );

    Ok((headers, data))
}

/// `GET|DELETE /{id}/{delete_key}` -- delete a file with its delete key.
#[utoipa::path(
    delete,
    path = "/{id}/{delete_key}",
    tag = "Files",
    summary = "Delete a file",
    description = "Also reachable with `GET` so delete links can be opened in a browser.",
    params(
        ("id" = String, Path, description = "File identifier"),
        ("delete_key" = String, Path, description = "Delete key returned by the upload"),
    ),
    responses(
        (status = 200, description = "File deleted", body = String),
        (status = 403, description = "Wrong delete key"),
        (status = 404, description = "Unknown or expired file")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Path((id, delete_key)): Path<(String, String)>,
) -> Result<&'static str, ServerError> {
    if state.engine.delete(&id, &delete_key).await? {
        Ok("File deleted.")
    } else {
        Err(EngineError::NotFound.into())
    }
}

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use seedcore::access::{AuthorizationDecision, LookupFailure};
use seedcore::storage::DEFAULT_CONTENT_TYPE;
use seedcore::ResourceKey;

use super::{authenticate, InitDataQuery};
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub path: Option<String>,
    #[serde(rename = "initData")]
    pub init_data: Option<String>,
}

/// GET /api/file/{*path}
pub async fn handle_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<InitDataQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    serve_file(&state, &headers, query.init_data.as_deref(), Some(path)).await
}

/// GET /api/download?path=...
pub async fn handle_download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    serve_file(&state, &headers, query.init_data.as_deref(), query.path).await
}

async fn serve_file(
    state: &AppState,
    headers: &HeaderMap,
    query_init_data: Option<&str>,
    raw_path: Option<String>,
) -> Result<Response, ApiError> {
    let principal = authenticate(state, headers, query_init_data)?;

    let raw_path = raw_path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing file path".to_string()))?;
    let key = ResourceKey::parse(&raw_path)?;

    let decision = tokio::time::timeout(state.lookup_timeout, state.authorizer.authorize(&principal, &key))
        .await
        .unwrap_or_else(|_| AuthorizationDecision::lookup_error(LookupFailure::TimedOut));

    if let AuthorizationDecision::Deny(reason) = &decision {
        log::warn!("🚫 Download of {} by {} refused: {}", key, principal, decision.reason());
        return Err(ApiError::from_denial(reason));
    }
    log::info!("📥 Download of {} by {} ({})", key, principal, decision.reason());

    // Bounds the wait for response headers only; the body streams unbounded
    let object = tokio::time::timeout(state.lookup_timeout, state.storage.fetch(&key))
        .await
        .map_err(|_| {
            log::warn!("Storage fetch for {} timed out", key);
            ApiError::Unavailable("storage fetch timed out".to_string())
        })?
        .map_err(|e| {
            log::warn!("Storage fetch for {} failed: {}", key, e);
            ApiError::from(e)
        })?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&object.content_type).unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );
    response_headers.insert(CONTENT_DISPOSITION, attachment_header(key.file_name())?);
    if let Some(length) = object.content_length {
        response_headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok((StatusCode::OK, response_headers, Body::from_stream(object.body)).into_response())
}

/// `attachment; filename="..."` with the name percent-encoded.
fn attachment_header(file_name: &str) -> Result<HeaderValue, ApiError> {
    let value = format!("attachment; filename=\"{}\"", urlencoding::encode(file_name));
    HeaderValue::from_str(&value).map_err(|e| ApiError::Internal(format!("invalid file name header: {}", e)))
}

//! Request handlers
//!
//! Each handler authenticates first, so an unsigned request never learns
//! whether a path or payload was valid.

pub mod download;
pub mod relay;

use axum::http::HeaderMap;
use serde::Deserialize;

use seedcore::Principal;

use crate::error::ApiError;
use crate::server::AppState;

/// Header the Mini App sends its signed init data in.
pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

/// Query fallback for clients that cannot set headers (e.g. plain links).
#[derive(Debug, Default, Deserialize)]
pub struct InitDataQuery {
    #[serde(rename = "initData")]
    pub init_data: Option<String>,
}

/// Verifies the request's init data, preferring a non-empty header over the query.
pub(crate) fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    query_init_data: Option<&str>,
) -> Result<Principal, ApiError> {
    let init_data = headers
        .get(INIT_DATA_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .or(query_init_data.filter(|v| !v.is_empty()))
        .ok_or_else(|| ApiError::Unauthorized("missing Telegram init data".to_string()))?;

    state.verifier.verify(init_data).map_err(|failure| {
        log::warn!("Rejected init data: {}", failure.kind());
        ApiError::from(failure)
    })
}

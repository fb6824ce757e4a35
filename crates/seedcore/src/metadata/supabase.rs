//! Supabase PostgREST client for the `files` and `shares` tables.
//!
//! `files.storage_path` maps a storage object to its memo (`memo_id`);
//! `shares (memo_id, to_user_id)` rows grant a user read access to a memo.
//! `memos (id, user_id)` names each memo's author.
//! `to_user_id` and `user_id` may be stored as text, so user matching is done by value.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{AccessGrant, DeliveryRecord, MetadataError, MetadataStore, RecordId, UserRef};
use crate::access::ResourceKey;
use crate::config::ConfigError;

/// Maximum number of response body bytes kept in error messages.
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Deserialize)]
struct FileRow {
    memo_id: Option<RecordId>,
}

#[derive(Debug, Deserialize)]
struct MemoRow {
    user_id: Option<UserRef>,
}

/// PostgREST-backed [`MetadataStore`].
#[derive(Clone)]
pub struct SupabaseMetadata {
    http: reqwest::Client,
    rest_url: Url,
}

impl SupabaseMetadata {
    /// Creates a client for `{supabase_url}/rest/v1`.
    pub fn new(supabase_url: &Url, service_key: &SecretString, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            http: build_client(service_key, timeout)?,
            rest_url: endpoint(supabase_url, &["rest", "v1"])?,
        })
    }

    fn table_url(&self, table: &str) -> Url {
        let mut url = self.rest_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(table);
        }
        url
    }
}

#[async_trait]
impl MetadataStore for SupabaseMetadata {
    async fn find_owning_record(&self, key: &ResourceKey) -> Result<Option<RecordId>, MetadataError> {
        let storage_path = format!("eq.{}", key.as_str());
        let response = self
            .http
            .get(self.table_url("files"))
            .query(&[("select", "memo_id"), ("storage_path", storage_path.as_str()), ("limit", "1")])
            .send()
            .await?;

        let rows: Vec<FileRow> = decode(response).await?;
        let record = rows.into_iter().find_map(|row| row.memo_id);
        log::debug!("files lookup for {}: {:?}", key, record);
        Ok(record)
    }

    async fn find_record_owner(&self, record: &RecordId) -> Result<Option<UserRef>, MetadataError> {
        let id_filter = format!("eq.{}", record);
        let response = self
            .http
            .get(self.table_url("memos"))
            .query(&[("select", "user_id"), ("id", id_filter.as_str()), ("limit", "1")])
            .send()
            .await?;

        let rows: Vec<MemoRow> = decode(response).await?;
        let owner = rows.into_iter().find_map(|row| row.user_id);
        log::debug!("memos lookup for {}: {:?}", record, owner);
        Ok(owner)
    }

    async fn find_grant(&self, record: &RecordId, user_id: i64) -> Result<Option<AccessGrant>, MetadataError> {
        let memo_filter = format!("eq.{}", record);
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .http
            .get(self.table_url("shares"))
            .query(&[
                ("select", "memo_id,to_user_id"),
                ("memo_id", memo_filter.as_str()),
                ("to_user_id", user_filter.as_str()),
            ])
            .send()
            .await?;

        let grants: Vec<AccessGrant> = decode(response).await?;
        let grant = grants.into_iter().find(|grant| grant.grantee.matches(user_id));
        log::debug!("shares lookup for memo {} and user {}: found={}", record, user_id, grant.is_some());
        Ok(grant)
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<(), MetadataError> {
        let response = self
            .http
            .post(self.table_url("shares"))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        check_status(response).await?;
        log::debug!(
            "Recorded delivery of memo {} from {} to {}",
            record.record_id,
            record.from_user_id,
            record.to_user_id
        );
        Ok(())
    }
}

/// HTTP client sending the Supabase service key on every request.
pub(crate) fn build_client(service_key: &SecretString, timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    let invalid_key = |e: reqwest::header::InvalidHeaderValue| ConfigError::Invalid {
        key: "SUPABASE_SERVICE_KEY",
        reason: e.to_string(),
    };

    let mut apikey = HeaderValue::from_str(service_key.expose_secret()).map_err(invalid_key)?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", service_key.expose_secret())).map_err(invalid_key)?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("apikey", apikey);
    headers.insert(AUTHORIZATION, bearer);

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Invalid {
            key: "SUPABASE_URL",
            reason: format!("HTTP client error: {}", e),
        })
}

/// `base` with `segments` appended to its path.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ConfigError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ConfigError::Invalid {
            key: "SUPABASE_URL",
            reason: "must be an http(s) base URL".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, MetadataError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(MetadataError::Status { status, body })
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, MetadataError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| MetadataError::Decode(e.to_string()))
}

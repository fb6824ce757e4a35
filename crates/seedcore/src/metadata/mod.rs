//! Memo metadata: file ownership records and shares
//!
//! The Access Authorizer only needs two read lookups (which memo owns a file,
//! and whether that memo is shared with a user); the relay handler writes
//! share rows after delivering a memo, but only for memos the sender wrote.

pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::access::ResourceKey;

pub use supabase::SupabaseMetadata;

#[derive(Debug, Error)]
pub enum MetadataError {
    /// Transport failure or timeout talking to the store
    #[error("metadata store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Store answered with a non-success status
    #[error("metadata store returned status {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    /// Store answered with something we cannot read
    #[error("unexpected metadata response: {0}")]
    Decode(String),
}

/// Identifier of the record (memo) that owns a stored file.
///
/// Kept as text; numeric ids from the store are normalized to decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match UserRef::deserialize(deserializer)? {
            UserRef::Number(n) => Ok(RecordId(n.to_string())),
            UserRef::Text(s) => Ok(RecordId(s)),
        }
    }
}

/// A user id as stored by the metadata store: JSON number or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Number(i64),
    Text(String),
}

impl UserRef {
    /// Value comparison across representations: `"42"`, `" 42 "` and `42` all match 42.
    pub fn matches(&self, user_id: i64) -> bool {
        match self {
            UserRef::Number(n) => *n == user_id,
            UserRef::Text(s) => s.trim().parse::<i64>().map(|n| n == user_id).unwrap_or(false),
        }
    }
}

impl From<i64> for UserRef {
    fn from(id: i64) -> Self {
        UserRef::Number(id)
    }
}

impl From<&str> for UserRef {
    fn from(id: &str) -> Self {
        UserRef::Text(id.to_string())
    }
}

/// Permission for `grantee` to read files belonging to `record_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    #[serde(rename = "memo_id")]
    pub record_id: RecordId,
    #[serde(rename = "to_user_id")]
    pub grantee: UserRef,
}

/// Share row written after a memo was relayed to another user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRecord {
    #[serde(rename = "memo_id")]
    pub record_id: RecordId,
    pub from_user_id: i64,
    pub to_user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo_text: Option<String>,
    pub sent_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Read/write access to memo metadata.
///
/// Implementations must be safe to call from concurrent requests; the
/// Authorizer never caches results.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Record (memo) that owns the file at `key`, if the store knows it.
    async fn find_owning_record(&self, key: &ResourceKey) -> Result<Option<RecordId>, MetadataError>;

    /// Author of `record`, if the store knows it.
    async fn find_record_owner(&self, record: &RecordId) -> Result<Option<UserRef>, MetadataError>;

    /// A grant on `record` whose grantee equals `user_id` by value.
    async fn find_grant(&self, record: &RecordId, user_id: i64) -> Result<Option<AccessGrant>, MetadataError>;

    /// Persists a delivery; this is what later grants access to the recipient.
    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<(), MetadataError>;
}

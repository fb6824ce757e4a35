//! Identity verification for Telegram Mini App requests
//!
//! Turns the signed init data a Mini App sends into an authenticated
//! [`Principal`]. Pure: no I/O, no logging; callers decide how to respond.

pub mod init_data;
pub mod verifier;

use thiserror::Error;

pub use init_data::InitData;
pub use verifier::{sign_init_data, verify, InitDataVerifier};

/// Why init data was rejected. Every variant maps to "unauthenticated".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    /// No `hash` field (or nothing at all) was sent
    #[error("init data is malformed or has no hash")]
    MalformedPayload,

    /// The signature does not match the payload
    #[error("init data signature mismatch")]
    SignatureMismatch,

    /// No `user` field, or it has no numeric `id`
    #[error("init data has no user identity")]
    MissingIdentity,

    /// `auth_date` is older than the configured maximum age
    #[error("init data is too old ({age_secs} seconds)")]
    Expired { age_secs: i64 },
}

impl VerificationFailure {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationFailure::MalformedPayload => "malformed_payload",
            VerificationFailure::SignatureMismatch => "signature_mismatch",
            VerificationFailure::MissingIdentity => "missing_identity",
            VerificationFailure::Expired { .. } => "expired",
        }
    }
}

/// An authenticated Telegram user, valid for one request.
///
/// Only `id` takes part in access decisions; `username` is for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: i64,
    username: Option<String>,
}

impl Principal {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            username: None,
        }
    }

    pub(crate) fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.username {
            Some(username) => write!(f, "{} (@{})", self.id, username),
            None => write!(f, "{}", self.id),
        }
    }
}

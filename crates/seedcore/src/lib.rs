//! SeedNote core - access control for the SeedNote Telegram Mini App API
//!
//! This library holds everything the HTTP layer needs that is not HTTP:
//! verifying Telegram init data, deciding who may read a stored file,
//! and the collaborators that talk to Supabase and the Bot API.
//!
//! # Module Structure
//!
//! - `auth`: Telegram Mini App init data verification (Identity Verifier)
//! - `access`: resource keys and the file Access Authorizer
//! - `metadata`: metadata store trait and the Supabase PostgREST client
//! - `storage`: object store trait and the Supabase Storage client
//! - `messaging`: bot messaging trait and the teloxide client
//! - `config`, `error`, `logging`: process-wide plumbing

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod metadata;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use access::{AccessAuthorizer, AuthorizationDecision, MalformedResourceKey, ResourceKey};
pub use auth::{InitDataVerifier, Principal, VerificationFailure};
pub use config::Config;
pub use error::{AppError, AppResult};

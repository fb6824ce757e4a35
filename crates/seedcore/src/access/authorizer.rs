use std::fmt;
use std::sync::Arc;

use super::resource::ResourceKey;
use crate::auth::Principal;
use crate::metadata::MetadataStore;

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// The key lives under the principal's own id
    OwnerMatch,
    /// The owning memo is shared with the principal
    GrantFound,
}

/// Why the metadata lookups could not reach a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// No record owns this key
    NotFound,
    /// The store errored
    Unavailable(String),
    /// The caller's time bound elapsed
    TimedOut,
}

/// Why access was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The owning memo exists but is not shared with the principal
    NoGrant,
    LookupError(LookupFailure),
}

/// Outcome of one authorization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow(AllowReason),
    Deny(DenyReason),
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow(_))
    }

    /// Stable label: `owner-match`, `grant-found`, `no-grant` or `lookup-error`.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthorizationDecision::Allow(AllowReason::OwnerMatch) => "owner-match",
            AuthorizationDecision::Allow(AllowReason::GrantFound) => "grant-found",
            AuthorizationDecision::Deny(DenyReason::NoGrant) => "no-grant",
            AuthorizationDecision::Deny(DenyReason::LookupError(_)) => "lookup-error",
        }
    }

    pub fn lookup_error(failure: LookupFailure) -> Self {
        AuthorizationDecision::Deny(DenyReason::LookupError(failure))
    }
}

impl fmt::Display for AuthorizationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.is_allowed() { "allow" } else { "deny" };
        write!(f, "{}: {}", verdict, self.reason())
    }
}

/// Decides whether a principal may read a stored file.
///
/// Ownership is checked first because it needs no round trip; only keys
/// under someone else's id reach the metadata store.
#[derive(Clone)]
pub struct AccessAuthorizer {
    metadata: Arc<dyn MetadataStore>,
}

impl AccessAuthorizer {
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Owner match, else owning record lookup, else grant lookup.
    pub async fn authorize(&self, principal: &Principal, key: &ResourceKey) -> AuthorizationDecision {
        if key.is_owned_by(principal.id()) {
            return AuthorizationDecision::Allow(AllowReason::OwnerMatch);
        }

        let record = match self.metadata.find_owning_record(key).await {
            Ok(Some(record)) => record,
            Ok(None) => return AuthorizationDecision::lookup_error(LookupFailure::NotFound),
            Err(e) => return AuthorizationDecision::lookup_error(LookupFailure::Unavailable(e.to_string())),
        };

        match self.metadata.find_grant(&record, principal.id()).await {
            Ok(Some(grant)) if grant.grantee.matches(principal.id()) => {
                AuthorizationDecision::Allow(AllowReason::GrantFound)
            }
            Ok(_) => AuthorizationDecision::Deny(DenyReason::NoGrant),
            Err(e) => AuthorizationDecision::lookup_error(LookupFailure::Unavailable(e.to_string())),
        }
    }
}

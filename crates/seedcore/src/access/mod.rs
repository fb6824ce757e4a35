//! File access control
//!
//! A principal may read a stored file if its key lives under the principal's
//! own id, or if the memo owning it has been shared with them.

pub mod authorizer;
pub mod resource;

pub use authorizer::{AccessAuthorizer, AllowReason, AuthorizationDecision, DenyReason, LookupFailure};
pub use resource::{MalformedResourceKey, ResourceKey};

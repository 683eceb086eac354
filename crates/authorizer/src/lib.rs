//! Permission authorizer for permcache
//!
//! [`PermissionAuthorizer::is_authorized`] is the one entry point request
//! handlers call. [`guard`] turns its answer into an HTTP status.

pub mod authorizer;
pub mod guard;
pub mod stats;

pub use authorizer::{PermissionAuthorizer, PermissionAuthorizerBuilder};
pub use guard::{bearer_token, check_access, AccessDecision};
pub use stats::{AuthorizerStats, StatsSnapshot};

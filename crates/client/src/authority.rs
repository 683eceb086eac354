//! The protocol seam between this service and the remote authority

use async_trait::async_trait;
use permcache_core::{ApplicationCredential, PermissionName, Result, SubjectToken};

/// Remote source of truth for authorization decisions.
///
/// Implementations perform exactly one exchange per call and never retry;
/// retrying is the caller's decision.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Submit this service's identity and receive a fresh credential
    async fn login(&self) -> Result<ApplicationCredential>;

    /// Ask whether `subject` holds `permission`, authenticating with
    /// `credential`. A rejected credential is `Error::AuthenticationFailed`.
    async fn check_permission(
        &self,
        subject: &SubjectToken,
        permission: &PermissionName,
        credential: &ApplicationCredential,
    ) -> Result<bool>;
}

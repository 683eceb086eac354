//! Application credential lifecycle on top of an [`Authority`]

use crate::authority::Authority;
use permcache_cache::KeyValueCache;
use permcache_core::{
    ApplicationCredential, PermissionName, Result, SubjectToken, APPLICATION_CREDENTIAL_KEY,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Authority client that keeps this service's credential in the cache
#[derive(Clone)]
pub struct AuthorizationClient {
    authority: Arc<dyn Authority>,
    cache: Arc<dyn KeyValueCache>,
    credential_ttl: Option<Duration>,
}

impl AuthorizationClient {
    pub fn new(authority: Arc<dyn Authority>, cache: Arc<dyn KeyValueCache>) -> Self {
        Self {
            authority,
            cache,
            credential_ttl: None,
        }
    }

    /// Expire the cached credential after `ttl`; `None` uses the store default
    pub fn with_credential_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.credential_ttl = ttl;
        self
    }

    pub fn credential_ttl(&self) -> Option<Duration> {
        self.credential_ttl
    }

    /// Return the cached credential, logging in when there is none
    pub async fn ensure_application_credential(&self) -> Result<ApplicationCredential> {
        if let Some(cached) = self.cache.get(APPLICATION_CREDENTIAL_KEY).await? {
            match ApplicationCredential::new(cached) {
                Ok(credential) => {
                    debug!(credential = %credential.fingerprint(), "using cached application credential");
                    return Ok(credential);
                }
                Err(_) => debug!("ignoring empty cached application credential"),
            }
        }

        self.login_and_store().await
    }

    /// Discard the current credential and log in again
    pub async fn renew_application_credential(&self) -> Result<ApplicationCredential> {
        self.invalidate_application_credential().await;
        self.login_and_store().await
    }

    /// Remove the cached credential so the next request logs in
    pub async fn invalidate_application_credential(&self) {
        self.cache.remove(APPLICATION_CREDENTIAL_KEY).await;
    }

    pub async fn check_permission(
        &self,
        subject: &SubjectToken,
        permission: &PermissionName,
        credential: &ApplicationCredential,
    ) -> Result<bool> {
        self.authority
            .check_permission(subject, permission, credential)
            .await
    }

    async fn login_and_store(&self) -> Result<ApplicationCredential> {
        let credential = self.authority.login().await?;
        info!(
            credential = %credential.fingerprint(),
            "obtained application credential"
        );

        self.cache
            .set(
                APPLICATION_CREDENTIAL_KEY,
                credential.expose(),
                self.credential_ttl,
            )
            .await;
        Ok(credential)
    }
}

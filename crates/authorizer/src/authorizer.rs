//! Cache-aside permission checks
//!
//! A subject's confirmed permissions are kept under `PERMISSIONS|<token>` as
//! a `|`-joined allow-list. Only grants are ever written; a denial always
//! comes from a live authority round trip.

use crate::stats::{AuthorizerStats, StatsSnapshot};
use permcache_cache::{DisabledCache, HttpCache, KeyValueCache, MemoryCache, RedisCache};
use permcache_client::{Authority, AuthorizationClient, HttpAuthority};
use permcache_config::{AuthorizerConfig, CacheBackend};
use permcache_core::{
    ApplicationCredential, Error, PermissionName, PermissionSet, Result, SubjectToken,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Answers "may this subject do this?" using a cache in front of the authority.
///
/// Cloning is cheap; clones share collaborators and counters.
#[derive(Clone)]
pub struct PermissionAuthorizer {
    inner: Arc<Inner>,
}

struct Inner {
    cache: Arc<dyn KeyValueCache>,
    client: AuthorizationClient,
    permission_ttl: Duration,
    stats: AuthorizerStats,
}

impl fmt::Debug for PermissionAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionAuthorizer")
            .field("permission_ttl", &self.inner.permission_ttl)
            .field("credential_ttl", &self.inner.client.credential_ttl())
            .field("stats", &self.inner.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl PermissionAuthorizer {
    pub fn builder() -> PermissionAuthorizerBuilder {
        PermissionAuthorizerBuilder::default()
    }

    /// Wire the HTTP authority and the configured cache backend
    pub fn from_config(config: &AuthorizerConfig) -> Result<Self> {
        config.validate()?;

        let cache: Arc<dyn KeyValueCache> = match &config.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::Http { endpoint } => {
                Arc::new(HttpCache::new(endpoint, config.cache.request_timeout)?)
            }
            CacheBackend::Redis { address } => {
                Arc::new(RedisCache::new(address, config.cache.request_timeout)?)
            }
            CacheBackend::Disabled => Arc::new(DisabledCache),
        };
        let authority = Arc::new(HttpAuthority::new(&config.authority)?);

        let mut builder = Self::builder()
            .cache(cache)
            .authority(authority)
            .permission_ttl(config.cache.permission_ttl);
        if let Some(ttl) = config.cache.credential_ttl {
            builder = builder.credential_ttl(ttl);
        }
        builder.build()
    }

    /// Whether `subject_token` holds `permission`.
    ///
    /// Cached grants answer without a network call. Anything else goes to
    /// the authority, and only a grant is written back. Errors from the
    /// cache or the authority are returned unchanged; callers must treat
    /// them as "not authorized".
    pub async fn is_authorized(&self, subject_token: &str, permission: &str) -> Result<bool> {
        let subject = SubjectToken::new(subject_token)?;
        let permission = PermissionName::new(permission)?;
        let key = subject.permissions_key();

        let mut granted = self
            .inner
            .cache
            .get(&key)
            .await?
            .map(|cached| PermissionSet::decode(&cached))
            .unwrap_or_default();

        if granted.contains(permission.as_str()) {
            self.inner.stats.record_hit();
            debug!(subject = %subject.fingerprint(), %permission, "permission cache hit");
            return Ok(true);
        }
        self.inner.stats.record_miss();
        debug!(
            subject = %subject.fingerprint(),
            %permission,
            cached = granted.len(),
            "permission cache miss"
        );

        let allowed = self.check_with_authority(&subject, &permission).await?;
        self.inner.stats.record_verdict(allowed);

        if allowed {
            granted.insert(&permission);
            self.inner
                .cache
                .set(&key, &granted.encode(), Some(self.inner.permission_ttl))
                .await;
            debug!(
                subject = %subject.fingerprint(),
                %permission,
                granted = granted.len(),
                "cached permission grant"
            );
        }

        Ok(allowed)
    }

    /// The current application credential, logging in if necessary
    pub async fn application_credential(&self) -> Result<ApplicationCredential> {
        self.inner.client.ensure_application_credential().await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.inner.stats.reset();
    }

    /// One authority check, re-deriving the credential once if it is rejected
    async fn check_with_authority(
        &self,
        subject: &SubjectToken,
        permission: &PermissionName,
    ) -> Result<bool> {
        let client = &self.inner.client;
        let credential = client.ensure_application_credential().await?;

        self.inner.stats.record_authority_check();
        match client
            .check_permission(subject, permission, &credential)
            .await
        {
            Err(err) if err.is_authentication_failure() => {
                warn!(
                    credential = %credential.fingerprint(),
                    error = %err,
                    "authority rejected application credential, renewing"
                );
                self.inner.stats.record_credential_renewal();
                let renewed = client.renew_application_credential().await?;

                self.inner.stats.record_authority_check();
                match client.check_permission(subject, permission, &renewed).await {
                    Err(err) if err.is_authentication_failure() => {
                        warn!(
                            credential = %renewed.fingerprint(),
                            "authority rejected renewed application credential"
                        );
                        client.invalidate_application_credential().await;
                        Err(err)
                    }
                    other => other,
                }
            }
            other => other,
        }
    }
}

/// Builder for [`PermissionAuthorizer`]
#[derive(Default)]
pub struct PermissionAuthorizerBuilder {
    cache: Option<Arc<dyn KeyValueCache>>,
    authority: Option<Arc<dyn Authority>>,
    permission_ttl: Option<Duration>,
    credential_ttl: Option<Duration>,
}

impl PermissionAuthorizerBuilder {
    pub fn cache(mut self, cache: Arc<dyn KeyValueCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn authority(mut self, authority: Arc<dyn Authority>) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Lifetime of a subject's cached grants (required)
    pub fn permission_ttl(mut self, ttl: Duration) -> Self {
        self.permission_ttl = Some(ttl);
        self
    }

    /// Lifetime of the cached application credential
    pub fn credential_ttl(mut self, ttl: Duration) -> Self {
        self.credential_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> Result<PermissionAuthorizer> {
        let cache = self
            .cache
            .ok_or_else(|| Error::configuration("authorizer requires a cache"))?;
        let authority = self
            .authority
            .ok_or_else(|| Error::configuration("authorizer requires an authority"))?;
        let permission_ttl = self
            .permission_ttl
            .filter(|ttl| !ttl.is_zero())
            .ok_or_else(|| {
                Error::configuration("authorizer requires a non-zero permission TTL")
            })?;

        let client = AuthorizationClient::new(authority, cache.clone())
            .with_credential_ttl(self.credential_ttl);

        Ok(PermissionAuthorizer {
            inner: Arc::new(Inner {
                cache,
                client,
                permission_ttl,
                stats: AuthorizerStats::new(),
            }),
        })
    }
}

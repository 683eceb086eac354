//! Request-level access decisions for HTTP handlers

use crate::authorizer::PermissionAuthorizer;
use permcache_core::{Error, ErrorKind};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::warn;

const BEARER_PREFIX: &str = "bearer ";

/// Outcome of guarding one request
#[derive(Debug)]
pub enum AccessDecision {
    Granted,
    /// No usable bearer token, or authentication against the authority failed
    Unauthenticated,
    /// The authority said no
    Forbidden,
    /// Anything else went wrong; the request must not proceed
    Failed(Error),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AccessDecision::Granted => StatusCode::OK,
            AccessDecision::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessDecision::Forbidden => StatusCode::FORBIDDEN,
            AccessDecision::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = &value[BEARER_PREFIX.len()..];
    (!token.is_empty()).then_some(token)
}

/// Decide whether the request carrying `headers` may use `permission`
pub async fn check_access(
    authorizer: &PermissionAuthorizer,
    headers: &HeaderMap,
    permission: &str,
) -> AccessDecision {
    let Some(token) = bearer_token(headers) else {
        return AccessDecision::Unauthenticated;
    };

    match authorizer.is_authorized(token, permission).await {
        Ok(true) => AccessDecision::Granted,
        Ok(false) => AccessDecision::Forbidden,
        Err(err) if err.kind() == ErrorKind::Authentication => {
            warn!(%permission, error = %err, "authentication failure while checking access");
            AccessDecision::Unauthenticated
        }
        Err(err) => {
            warn!(%permission, error = %err, "access check failed");
            AccessDecision::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permcache_cache::MemoryCache;
    use permcache_client::testing::ScriptedAuthority;
    use reqwest::header::HeaderValue;
    use std::sync::Arc;
    use std::time::Duration;

    fn headers(authorization: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(authorization));
        headers
    }

    fn authorizer(authority: &Arc<ScriptedAuthority>) -> PermissionAuthorizer {
        PermissionAuthorizer::builder()
            .cache(Arc::new(MemoryCache::new()))
            .authority(authority.clone())
            .permission_ttl(Duration::from_secs(60))
            .build()
            .unwrap()
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("BEARER abc")), Some("abc"));
    }

    #[test]
    fn missing_or_foreign_credentials_have_no_token() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
    }

    #[tokio::test]
    async fn decisions_map_to_statuses() {
        let authority = Arc::new(ScriptedAuthority::new());
        authority
            .grant("abc", "product-view", true)
            .grant("abc", "product-edit", false);
        let authorizer = authorizer(&authority);

        let granted = check_access(&authorizer, &headers("Bearer abc"), "product-view").await;
        let forbidden = check_access(&authorizer, &headers("Bearer abc"), "product-edit").await;
        let anonymous = check_access(&authorizer, &HeaderMap::new(), "product-view").await;

        assert!(granted.is_granted());
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authentication_failure_is_unauthenticated() {
        let authority = Arc::new(ScriptedAuthority::new());
        authority.reject_all_credentials(true);
        let authorizer = authorizer(&authority);

        let decision = check_access(&authorizer, &headers("Bearer abc"), "product-view").await;

        assert!(matches!(decision, AccessDecision::Unauthenticated));
    }

    #[tokio::test]
    async fn other_errors_fail_closed() {
        let authority = Arc::new(ScriptedAuthority::new());
        authority.set_unreachable(true);
        let authorizer = authorizer(&authority);

        let decision = check_access(&authorizer, &headers("Bearer abc"), "product-view").await;

        assert!(!decision.is_granted());
        assert_eq!(decision.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! In-process [`Authority`] for tests of code built on this crate

use crate::authority::Authority;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use permcache_core::{ApplicationCredential, Error, PermissionName, Result, SubjectToken};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const ENDPOINT: &str = "scripted://authority";

/// Authority whose answers are set up ahead of time.
///
/// Credentials are issued as `app-credential-1`, `app-credential-2`, ... and
/// every call is counted so tests can assert on round trips.
#[derive(Debug, Default)]
pub struct ScriptedAuthority {
    grants: DashMap<(String, String), bool>,
    rejected: DashSet<String>,
    reject_all: AtomicBool,
    unreachable: AtomicBool,
    logins: AtomicUsize,
    checks: AtomicUsize,
    last_credential: Mutex<Option<ApplicationCredential>>,
}

impl ScriptedAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `allowed` for (`subject`, `permission`); unknown pairs are denied
    pub fn grant(&self, subject: &str, permission: &str, allowed: bool) -> &Self {
        self.grants
            .insert((subject.to_string(), permission.to_string()), allowed);
        self
    }

    /// Reject checks made with this credential
    pub fn reject_credential(&self, credential: &str) -> &Self {
        self.rejected.insert(credential.to_string());
        self
    }

    /// Reject checks made with any credential
    pub fn reject_all_credentials(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Fail every call as if the authority could not be reached
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    /// Credential handed out by the most recent login
    pub fn last_credential(&self) -> Option<ApplicationCredential> {
        self.last_credential.lock().clone()
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            let refused =
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(Error::transport(ENDPOINT, refused));
        }
        Ok(())
    }
}

#[async_trait]
impl Authority for ScriptedAuthority {
    async fn login(&self) -> Result<ApplicationCredential> {
        let issued = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        self.ensure_reachable()?;

        let credential = ApplicationCredential::new(format!("app-credential-{issued}"))?;
        *self.last_credential.lock() = Some(credential.clone());
        Ok(credential)
    }

    async fn check_permission(
        &self,
        subject: &SubjectToken,
        permission: &PermissionName,
        credential: &ApplicationCredential,
    ) -> Result<bool> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.ensure_reachable()?;

        if self.reject_all.load(Ordering::SeqCst) || self.rejected.contains(credential.expose()) {
            return Err(Error::authentication_failed(
                ENDPOINT,
                "application credential rejected",
            ));
        }

        let key = (subject.as_str().to_string(), permission.as_str().to_string());
        Ok(self.grants.get(&key).is_some_and(|allowed| *allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(token: &str) -> SubjectToken {
        SubjectToken::new(token).unwrap()
    }

    fn permission(name: &str) -> PermissionName {
        PermissionName::new(name).unwrap()
    }

    #[tokio::test]
    async fn answers_scripted_grants() {
        let authority = ScriptedAuthority::new();
        authority
            .grant("abc", "product-view", true)
            .grant("abc", "product-edit", false);
        let credential = authority.login().await.unwrap();

        assert!(authority
            .check_permission(&subject("abc"), &permission("product-view"), &credential)
            .await
            .unwrap());
        assert!(!authority
            .check_permission(&subject("abc"), &permission("product-edit"), &credential)
            .await
            .unwrap());
        assert!(!authority
            .check_permission(&subject("xyz"), &permission("product-view"), &credential)
            .await
            .unwrap());
        assert_eq!(authority.check_count(), 3);
    }

    #[tokio::test]
    async fn issues_numbered_credentials() {
        let authority = ScriptedAuthority::new();

        let first = authority.login().await.unwrap();
        let second = authority.login().await.unwrap();

        assert_eq!(first.expose(), "app-credential-1");
        assert_eq!(second.expose(), "app-credential-2");
        assert_eq!(authority.last_credential(), Some(second));
    }

    #[tokio::test]
    async fn rejected_credential_is_authentication_failure() {
        let authority = ScriptedAuthority::new();
        authority.reject_credential("app-credential-1");
        let credential = authority.login().await.unwrap();

        let err = authority
            .check_permission(&subject("abc"), &permission("view"), &credential)
            .await
            .unwrap_err();

        assert!(err.is_authentication_failure());
    }
}

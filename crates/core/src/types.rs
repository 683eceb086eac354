//! Validated newtypes for the values that flow through an authorization check

use crate::constants::{PERMISSIONS_KEY_PREFIX, PERMISSION_DELIMITER, TOKEN_FINGERPRINT_LEN};
use crate::errors::{Error, Result, Validate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;

/// Short stable digest of a secret, safe to put in logs
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(TOKEN_FINGERPRINT_LEN);
    encoded
}

/// Bearer token of the end user whose permission is being checked
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SubjectToken(String);

impl SubjectToken {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        Validate::not_empty(&token, "subject_token")?;
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }

    /// Cache key of this subject's granted permission set
    pub fn permissions_key(&self) -> String {
        format!("{PERMISSIONS_KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for SubjectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SubjectToken")
            .field(&format_args!("sha256:{}", self.fingerprint()))
            .finish()
    }
}

impl TryFrom<&str> for SubjectToken {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Name of a capability defined by the authority, e.g. `product-view`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionName(String);

impl PermissionName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Validate::not_empty(&name, "permission")?;
        Validate::excludes(&name, PERMISSION_DELIMITER, "permission")?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for PermissionName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for PermissionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for PermissionName {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PermissionName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<PermissionName> for String {
    fn from(name: PermissionName) -> Self {
        name.0
    }
}

/// This service's own credential for calling the authority
#[derive(Clone, PartialEq, Eq)]
pub struct ApplicationCredential(String);

impl ApplicationCredential {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        Validate::not_empty(&token, "application_credential")?;
        Ok(Self(token))
    }

    /// The raw token, for building the `Authorization` header
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl fmt::Debug for ApplicationCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApplicationCredential([REDACTED])")
    }
}

/// Permissions already confirmed for one subject.
///
/// Stored in the cache as a `|`-joined string. Insertion order is kept so the
/// encoded value only ever grows at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: Vec<String>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a cached value. Empty segments are ignored.
    pub fn decode(value: &str) -> Self {
        let mut set = Self::new();
        for permission in value.split(PERMISSION_DELIMITER) {
            if !permission.is_empty() && !set.contains(permission) {
                set.granted.push(permission.to_string());
            }
        }
        set
    }

    pub fn encode(&self) -> String {
        self.granted.join(&PERMISSION_DELIMITER.to_string())
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.granted.iter().any(|granted| granted == permission)
    }

    /// Add a permission, returning `false` if it was already present
    pub fn insert(&mut self, permission: &PermissionName) -> bool {
        if self.contains(permission.as_str()) {
            return false;
        }
        self.granted.push(permission.as_str().to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.granted.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_token_rejects_empty() {
        assert!(SubjectToken::new("").is_err());
        assert!(SubjectToken::new("abc").is_ok());
    }

    #[test]
    fn subject_token_builds_permissions_key() {
        let token = SubjectToken::new("abc").unwrap();
        assert_eq!(token.permissions_key(), "PERMISSIONS|abc");
    }

    #[test]
    fn subject_token_debug_hides_token() {
        let token = SubjectToken::new("very-secret-bearer").unwrap();
        let debug_output = format!("{token:?}");

        assert!(!debug_output.contains("very-secret-bearer"));
        assert!(debug_output.contains(&token.fingerprint()));
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(fingerprint("abc").len(), TOKEN_FINGERPRINT_LEN);
    }

    #[test]
    fn permission_name_rejects_delimiter() {
        assert!(PermissionName::new("product-view").is_ok());
        assert!(PermissionName::new("").is_err());

        let err = PermissionName::new("product|view").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { field: "permission", .. }));
    }

    #[test]
    fn permission_name_deserialize_validates() {
        let ok: PermissionName = serde_json::from_str("\"unit-edit\"").unwrap();
        assert_eq!(ok.as_str(), "unit-edit");

        assert!(serde_json::from_str::<PermissionName>("\"\"").is_err());
    }

    #[test]
    fn application_credential_debug_redacts() {
        let credential = ApplicationCredential::new("app-secret-token").unwrap();
        let debug_output = format!("{credential:?}");

        assert!(!debug_output.contains("app-secret-token"));
        assert!(debug_output.contains("[REDACTED]"));
        assert_eq!(credential.expose(), "app-secret-token");
    }

    #[test]
    fn permission_set_decodes_cached_value() {
        let set = PermissionSet::decode("product-view|product-edit");

        assert!(set.contains("product-view"));
        assert!(set.contains("product-edit"));
        assert!(!set.contains("product"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn permission_set_ignores_empty_segments_and_duplicates() {
        let set = PermissionSet::decode("|view||view|edit|");

        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["view", "edit"]);
        assert!(!set.contains(""));
        assert!(PermissionSet::decode("").is_empty());
    }

    #[test]
    fn permission_set_appends_in_order() {
        let mut set = PermissionSet::decode("product-view");
        let edit = PermissionName::new("product-edit").unwrap();

        assert!(set.insert(&edit));
        assert!(!set.insert(&edit));
        assert_eq!(set.encode(), "product-view|product-edit");
    }
}

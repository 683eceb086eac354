//! Configuration loader with file and environment precedence
//!
//! Values are resolved as defaults < JSON file < environment. The environment
//! is read through an injectable lookup so callers (and tests) can supply
//! their own source instead of the process environment.

use crate::config::{
    AuthorityConfig, AuthorizerConfig, CacheBackend, CacheSettings, ConfigSource,
    DEFAULT_CACHE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS,
    DEFAULT_REQUEST_TIMEOUT,
};
use permcache_core::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// Environment variable names
pub const AUTH_SERVICE_ENDPOINT_VAR: &str = "AUTH_SERVICE_ENDPOINT";
pub const AUTH_SERVICE_USER_ID_VAR: &str = "AUTH_SERVICE_USER_ID";
pub const AUTH_SERVICE_PASSWORD_VAR: &str = "AUTH_SERVICE_PASSWORD";
pub const REQUEST_TIMEOUT_VAR: &str = "PERMCACHE_REQUEST_TIMEOUT_SECS";
pub const CONNECT_TIMEOUT_VAR: &str = "PERMCACHE_CONNECT_TIMEOUT_SECS";
pub const MAX_REDIRECTS_VAR: &str = "PERMCACHE_MAX_REDIRECTS";
pub const CACHE_BACKEND_VAR: &str = "PERMCACHE_CACHE_BACKEND";
pub const CACHE_ENDPOINT_VAR: &str = "PERMCACHE_CACHE_ENDPOINT";
pub const REDIS_ADDRESS_VAR: &str = "REDIS_ADDRESS";
pub const CACHE_TIMEOUT_VAR: &str = "PERMCACHE_CACHE_TIMEOUT_SECS";
pub const PERMISSION_TTL_VAR: &str = "PERMCACHE_PERMISSION_TTL_SECS";
pub const CREDENTIAL_TTL_VAR: &str = "PERMCACHE_CREDENTIAL_TTL_SECS";

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Loads an [`AuthorizerConfig`] from a file and the environment
pub struct ConfigLoader {
    file: Option<PathBuf>,
    lookup: Lookup,
}

impl ConfigLoader {
    /// Create a loader reading the process environment
    pub fn new() -> Self {
        Self {
            file: None,
            lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Read a JSON configuration file before applying the environment
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Replace the environment lookup
    pub fn lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Box::new(lookup);
        self
    }

    /// Load configuration with full precedence handling
    pub fn load(self) -> Result<AuthorizerConfig> {
        let (file_config, source) = match &self.file {
            Some(path) => (
                Self::load_from_file(path)?,
                ConfigSource::ConfigFile(path.clone()),
            ),
            None => (PartialConfig::default(), ConfigSource::Environment),
        };

        let env_config = Self::load_from_env(&self.lookup)?;
        let merged = file_config.overlay(env_config);
        let config = merged.finish(source)?;

        debug!(
            endpoint = %config.authority.endpoint,
            backend = ?config.cache.backend,
            permission_ttl = ?config.cache.permission_ttl,
            "loaded authorizer configuration"
        );
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<PartialConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!(
                "failed to parse config file '{}': {e}",
                path.display()
            ))
        })
    }

    fn load_from_env(lookup: &Lookup) -> Result<PartialConfig> {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        Ok(PartialConfig {
            authority: AuthoritySection {
                endpoint: var(AUTH_SERVICE_ENDPOINT_VAR),
                user_id: var(AUTH_SERVICE_USER_ID_VAR),
                password: var(AUTH_SERVICE_PASSWORD_VAR),
                request_timeout_secs: parse_number(REQUEST_TIMEOUT_VAR, var(REQUEST_TIMEOUT_VAR))?,
                connect_timeout_secs: parse_number(CONNECT_TIMEOUT_VAR, var(CONNECT_TIMEOUT_VAR))?,
                max_redirects: parse_number(MAX_REDIRECTS_VAR, var(MAX_REDIRECTS_VAR))?,
            },
            cache: CacheSection {
                backend: var(CACHE_BACKEND_VAR),
                endpoint: var(CACHE_ENDPOINT_VAR),
                address: var(REDIS_ADDRESS_VAR),
                request_timeout_secs: parse_number(CACHE_TIMEOUT_VAR, var(CACHE_TIMEOUT_VAR))?,
                permission_ttl_secs: parse_number(PERMISSION_TTL_VAR, var(PERMISSION_TTL_VAR))?,
                credential_ttl_secs: parse_number(CREDENTIAL_TTL_VAR, var(CREDENTIAL_TTL_VAR))?,
            },
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                Error::configuration(format!("{name} must be a whole number, got '{raw}'"))
            })
        })
        .transpose()
}

/// Configuration values as they appear in a file or the environment
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialConfig {
    authority: AuthoritySection,
    cache: CacheSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AuthoritySection {
    endpoint: Option<String>,
    user_id: Option<String>,
    password: Option<String>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    max_redirects: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CacheSection {
    backend: Option<String>,
    endpoint: Option<String>,
    /// Redis address
    address: Option<String>,
    request_timeout_secs: Option<u64>,
    permission_ttl_secs: Option<u64>,
    credential_ttl_secs: Option<u64>,
}

impl PartialConfig {
    /// Values present in `other` win
    fn overlay(self, other: PartialConfig) -> PartialConfig {
        PartialConfig {
            authority: AuthoritySection {
                endpoint: other.authority.endpoint.or(self.authority.endpoint),
                user_id: other.authority.user_id.or(self.authority.user_id),
                password: other.authority.password.or(self.authority.password),
                request_timeout_secs: other
                    .authority
                    .request_timeout_secs
                    .or(self.authority.request_timeout_secs),
                connect_timeout_secs: other
                    .authority
                    .connect_timeout_secs
                    .or(self.authority.connect_timeout_secs),
                max_redirects: other.authority.max_redirects.or(self.authority.max_redirects),
            },
            cache: CacheSection {
                backend: other.cache.backend.or(self.cache.backend),
                endpoint: other.cache.endpoint.or(self.cache.endpoint),
                address: other.cache.address.or(self.cache.address),
                request_timeout_secs: other
                    .cache
                    .request_timeout_secs
                    .or(self.cache.request_timeout_secs),
                permission_ttl_secs: other
                    .cache
                    .permission_ttl_secs
                    .or(self.cache.permission_ttl_secs),
                credential_ttl_secs: other
                    .cache
                    .credential_ttl_secs
                    .or(self.cache.credential_ttl_secs),
            },
        }
    }

    fn finish(self, source: ConfigSource) -> Result<AuthorizerConfig> {
        let required = |value: Option<String>, var: &str| {
            value.ok_or_else(|| Error::configuration(format!("{var} is required")))
        };

        let authority = AuthorityConfig {
            endpoint: required(self.authority.endpoint, AUTH_SERVICE_ENDPOINT_VAR)?,
            user_id: required(self.authority.user_id, AUTH_SERVICE_USER_ID_VAR)?,
            password: required(self.authority.password, AUTH_SERVICE_PASSWORD_VAR)?,
            request_timeout: self
                .authority
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            connect_timeout: self
                .authority
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            max_redirects: self.authority.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
        };

        // A Redis address alone selects the Redis backend
        let backend = match (self.cache.backend, self.cache.address) {
            (Some(name), address) if name.trim().eq_ignore_ascii_case("redis") => {
                CacheBackend::parse(&name, address.or(self.cache.endpoint))?
            }
            (Some(name), _) => CacheBackend::parse(&name, self.cache.endpoint)?,
            (None, Some(address)) => CacheBackend::Redis { address },
            (None, None) => CacheBackend::default(),
        };

        let permission_ttl = self
            .cache
            .permission_ttl_secs
            .map(Duration::from_secs)
            .ok_or_else(|| Error::configuration(format!("{PERMISSION_TTL_VAR} is required")))?;

        let cache = CacheSettings {
            backend,
            permission_ttl,
            credential_ttl: self.cache.credential_ttl_secs.map(Duration::from_secs),
            request_timeout: self
                .cache
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CACHE_TIMEOUT),
        };

        let config = AuthorizerConfig {
            authority,
            cache,
            source,
        };
        config.validate()?;
        Ok(config)
    }
}

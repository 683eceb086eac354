//! Settings for the authority connection and the permission cache
//!
//! The configuration is immutable after construction and can be shared
//! across tasks. Required values are checked once in [`AuthorizerConfig::validate`].

use permcache_core::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Complete configuration for a permission authorizer
#[derive(Debug, Clone)]
pub struct AuthorizerConfig {
    /// Remote authority connection
    pub authority: AuthorityConfig,
    /// Cache backend and retention
    pub cache: CacheSettings,
    /// Where the configuration came from
    pub source: ConfigSource,
}

impl AuthorizerConfig {
    /// Check required values and ranges
    pub fn validate(&self) -> Result<()> {
        self.authority.validate()?;
        self.cache.validate()
    }
}

/// How to reach and authenticate against the authority
#[derive(Clone)]
pub struct AuthorityConfig {
    /// Base URL of the authority, e.g. `https://auth.internal/api`
    pub endpoint: String,
    /// Service identity used for the login exchange
    pub user_id: String,
    /// Service password used for the login exchange
    pub password: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Upper bound on redirects followed for a single request
    pub max_redirects: usize,
}

impl fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("endpoint", &self.endpoint)
            .field("user_id", &self.user_id)
            .field("password", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

impl AuthorityConfig {
    fn validate(&self) -> Result<()> {
        validate_endpoint(&self.endpoint, "authority endpoint")?;
        if self.user_id.is_empty() {
            return Err(Error::configuration("authority user id is required"));
        }
        if self.password.is_empty() {
            return Err(Error::configuration("authority password is required"));
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(Error::configuration(
                "authority timeouts must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Which cache store backs the authorizer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheBackend {
    /// In-process store, lost on restart
    #[default]
    Memory,
    /// Remote key/value store reached over HTTP
    Http { endpoint: String },
    /// Redis server, as `host:port` or a `redis://` URL
    Redis { address: String },
    /// Caching switched off; every check reaches the authority
    Disabled,
}

impl CacheBackend {
    /// Parse a backend name as used in files and the environment
    pub fn parse(name: &str, endpoint: Option<String>) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "off" | "disabled" | "none" => Ok(CacheBackend::Disabled),
            "http" => endpoint
                .map(|endpoint| CacheBackend::Http { endpoint })
                .ok_or_else(|| Error::configuration("http cache backend requires an endpoint")),
            "redis" => endpoint
                .map(|address| CacheBackend::Redis { address })
                .ok_or_else(|| Error::configuration("redis cache backend requires an address")),
            other => Err(Error::configuration(format!(
                "unknown cache backend '{other}' (expected memory, redis, http or off)"
            ))),
        }
    }
}

/// Cache backend and retention policy
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    /// Lifetime of a subject's granted-permission entry
    pub permission_ttl: Duration,
    /// Lifetime of the cached application credential; `None` keeps the
    /// store default
    pub credential_ttl: Option<Duration>,
    /// Request timeout for remote cache backends
    pub request_timeout: Duration,
}

impl CacheSettings {
    fn validate(&self) -> Result<()> {
        if self.permission_ttl.is_zero() {
            return Err(Error::configuration(
                "permission cache TTL must be greater than zero",
            ));
        }
        if matches!(self.credential_ttl, Some(ttl) if ttl.is_zero()) {
            return Err(Error::configuration(
                "credential cache TTL must be greater than zero when set",
            ));
        }
        match &self.backend {
            CacheBackend::Http { endpoint } => validate_endpoint(endpoint, "cache endpoint")?,
            CacheBackend::Redis { address } if address.trim().is_empty() => {
                return Err(Error::configuration("redis address is required"));
            }
            _ => {}
        }
        Ok(())
    }
}

fn validate_endpoint(endpoint: &str, what: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Err(Error::configuration(format!("{what} is required")));
    }
    let url = Url::parse(endpoint)
        .map_err(|e| Error::configuration(format!("{what} '{endpoint}' is not a URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::configuration(format!(
            "{what} '{endpoint}' uses unsupported scheme '{scheme}'"
        ))),
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built in code
    Builder,
    /// Configuration file, possibly overridden by the environment
    ConfigFile(PathBuf),
    /// Environment variables only
    Environment,
}

/// Builder for creating configurations in code
pub struct AuthorizerConfigBuilder {
    endpoint: String,
    user_id: String,
    password: String,
    request_timeout: Duration,
    connect_timeout: Duration,
    max_redirects: usize,
    backend: CacheBackend,
    permission_ttl: Option<Duration>,
    credential_ttl: Option<Duration>,
    cache_timeout: Duration,
}

impl AuthorizerConfigBuilder {
    /// Create a new builder for the given authority and service identity
    pub fn new(
        endpoint: impl Into<String>,
        user_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_id: user_id.into(),
            password: password.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            backend: CacheBackend::default(),
            permission_ttl: None,
            credential_ttl: None,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_backend(mut self, backend: CacheBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_permission_ttl(mut self, ttl: Duration) -> Self {
        self.permission_ttl = Some(ttl);
        self
    }

    pub fn with_credential_ttl(mut self, ttl: Duration) -> Self {
        self.credential_ttl = Some(ttl);
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AuthorizerConfig> {
        let permission_ttl = self
            .permission_ttl
            .ok_or_else(|| Error::configuration("permission cache TTL is required"))?;

        let config = AuthorizerConfig {
            authority: AuthorityConfig {
                endpoint: self.endpoint,
                user_id: self.user_id,
                password: self.password,
                request_timeout: self.request_timeout,
                connect_timeout: self.connect_timeout,
                max_redirects: self.max_redirects,
            },
            cache: CacheSettings {
                backend: self.backend,
                permission_ttl,
                credential_ttl: self.credential_ttl,
                request_timeout: self.cache_timeout,
            },
            source: ConfigSource::Builder,
        };
        config.validate()?;
        Ok(config)
    }
}

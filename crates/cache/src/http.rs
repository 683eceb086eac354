//! Remote key/value store reached over HTTP
//!
//! The store exposes one resource per key under a base URL:
//! `GET` reads (404 is a miss), `PUT` writes the request body with an
//! optional `ttl` query parameter in seconds, `DELETE` removes.

use crate::traits::KeyValueCache;
use async_trait::async_trait;
use permcache_core::{fingerprint, Error, Result};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP cache backend
#[derive(Debug, Clone)]
pub struct HttpCache {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpCache {
    /// Create a client for the store at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            Error::configuration(format!("invalid cache endpoint '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "cache endpoint '{base_url}' cannot be used as a base URL"
            )));
        }
        // Keys are appended as path segments; drop a trailing slash first
        if let Ok(mut segments) = base_url.path_segments_mut() {
            segments.pop_if_empty();
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build cache client: {e}")))?;

        Ok(Self { base_url, client })
    }

    fn key_url(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(key);
        }
        url
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut request = self.client.put(self.key_url(key)).body(value.to_string());
        if let Some(ttl) = ttl {
            request = request.query(&[("ttl", ttl.as_secs().max(1))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::cache_with_source("set", log_key(key), e.without_url()))?;

        if !response.status().is_success() {
            return Err(Error::cache(
                "set",
                log_key(key),
                format!("store answered {}", response.status()),
            ));
        }
        Ok(())
    }

    async fn try_remove(&self, key: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.key_url(key))
            .send()
            .await
            .map_err(|e| Error::cache_with_source("remove", log_key(key), e.without_url()))?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(Error::cache(
                "remove",
                log_key(key),
                format!("store answered {status}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueCache for HttpCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.key_url(key))
            .send()
            .await
            .map_err(|e| Error::cache_with_source("get", log_key(key), e.without_url()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(key = %log_key(key), "remote cache miss");
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Error::cache(
                "get",
                log_key(key),
                format!("store answered {}", response.status()),
            ));
        }

        let value = response
            .text()
            .await
            .map_err(|e| Error::cache_with_source("get", log_key(key), e.without_url()))?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        if let Err(e) = self.try_set(key, value, ttl).await {
            warn!(key = %log_key(key), error = %e, "remote cache write dropped");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key).await {
            warn!(key = %log_key(key), error = %e, "remote cache delete dropped");
        }
    }
}

// Keys may embed bearer tokens; everything after the first '|' is fingerprinted
pub(crate) fn log_key(key: &str) -> String {
    match key.split_once('|') {
        Some((prefix, secret)) => format!("{prefix}|sha256:{}", fingerprint(secret)),
        None => key.to_string(),
    }
}

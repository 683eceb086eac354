//! A store that never remembers anything

use crate::traits::KeyValueCache;
use async_trait::async_trait;
use permcache_core::Result;
use std::time::Duration;

/// Cache stand-in for running without caching: every read misses
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCache;

#[async_trait]
impl KeyValueCache for DisabledCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) {}

    async fn remove(&self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_read_misses() {
        let cache = DisabledCache;

        cache.set("authToken", "token", None).await;

        assert_eq!(cache.get("authToken").await.unwrap(), None);
    }
}

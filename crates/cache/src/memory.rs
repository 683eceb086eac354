//! In-process cache store

use crate::traits::KeyValueCache;
use async_trait::async_trait;
use dashmap::DashMap;
use permcache_core::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// `DashMap`-backed store. Cloning shares the underlying map.
///
/// Expired entries read as misses and are dropped on access.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Entry>>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `ttl` to writes that do not carry their own
    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl: Some(ttl),
        }
    }

    /// Number of stored entries, including expired ones not yet dropped
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let expires_at = ttl.or(self.default_ttl).map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    async fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

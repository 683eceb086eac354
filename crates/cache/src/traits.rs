//! The key/value contract every cache store implements

use async_trait::async_trait;
use permcache_core::Result;
use std::time::Duration;

/// Generic string store with optional expiry.
///
/// Keys and values are opaque to implementations. A clean miss is `Ok(None)`;
/// `Err` means the store itself could not be used. Writes and deletes are
/// best effort: implementations log failures instead of returning them.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value; `None` keeps the store's default retention
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>);

    /// Delete a value
    async fn remove(&self, key: &str);
}

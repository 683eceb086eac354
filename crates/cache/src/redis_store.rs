//! Redis-backed cache store

use crate::http::log_key;
use crate::traits::KeyValueCache;
use async_trait::async_trait;
use permcache_core::{Error, Result};
use redis::aio::ConnectionManager;
use redis::{Client, FromRedisValue, RedisError, Value};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Redis store reached through a shared, lazily opened connection.
///
/// `address` is either a `redis://` URL or a bare `host:port`.
pub struct RedisCache {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("address", &self.client.get_connection_info().addr)
            .field("connected", &self.connection.initialized())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisCache {
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        let url = redis_url(address);
        let client = Client::open(url.as_str()).map_err(|e| {
            Error::configuration(format!("invalid redis address '{address}': {e}"))
        })?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            timeout,
        })
    }

    async fn connection(&self) -> std::result::Result<ConnectionManager, RedisError> {
        self.connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                debug!(address = ?self.client.get_connection_info().addr, "connected to redis");
                Ok::<_, RedisError>(manager)
            })
            .await
            .cloned()
    }

    /// Run one command under the configured timeout
    async fn run<T, F, Fut>(&self, operation: &'static str, key: &str, command: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = std::result::Result<T, RedisError>>,
    {
        let attempt = async {
            let connection = self.connection().await?;
            command(connection).await
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::cache_with_source(operation, log_key(key), e)),
            Err(_) => Err(Error::cache(
                operation,
                log_key(key),
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.run("set", key, |mut connection| async move {
            let mut command = redis::cmd("SET");
            command.arg(key).arg(value);
            if let Some(ttl) = ttl {
                command.arg("EX").arg(ttl.as_secs().max(1));
            }
            command.query_async::<_, ()>(&mut connection).await
        })
        .await
    }

    async fn try_remove(&self, key: &str) -> Result<()> {
        self.run("remove", key, |mut connection| async move {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, ()>(&mut connection)
                .await
        })
        .await
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let reply = self
            .run("get", key, |mut connection| async move {
                redis::cmd("GET")
                    .arg(key)
                    .query_async::<_, Value>(&mut connection)
                    .await
            })
            .await?;

        decode_reply(key, &reply)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        if let Err(e) = self.try_set(key, value, ttl).await {
            warn!(key = %log_key(key), error = %e, "redis cache write dropped");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key).await {
            warn!(key = %log_key(key), error = %e, "redis cache delete dropped");
        }
    }
}

/// `Nil` is a clean miss; anything else must be a string
fn decode_reply(key: &str, reply: &Value) -> Result<Option<String>> {
    Option::<String>::from_redis_value(reply)
        .map_err(|e| Error::cache_with_source("get", log_key(key), e))
}

fn redis_url(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("redis://{address}")
    }
}

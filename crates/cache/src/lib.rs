//! Cache stores for permcache
//!
//! Every store implements [`KeyValueCache`], a plain string get/set/delete
//! contract with optional expiry:
//! - [`MemoryCache`]: in-process `DashMap` store
//! - [`HttpCache`]: remote store reached over HTTP
//! - [`RedisCache`]: Redis server, `Nil` replies read as misses
//! - [`DisabledCache`]: always misses, for running without caching

pub mod disabled;
pub mod http;
pub mod memory;
pub mod redis_store;
pub mod traits;

pub use disabled::DisabledCache;
pub use http::HttpCache;
pub use memory::MemoryCache;
pub use redis_store::RedisCache;
pub use traits::KeyValueCache;

//! Key-value store client used for all room and player state.
//!
//! The game logic only talks to [`KvStore`]; which backend sits behind it is
//! decided once at startup and injected. Every method maps to a single
//! store command so callers can rely on each one being atomic on its own.
//! Nothing here is transactional across keys.

pub mod memory;
pub mod redis;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("corrupt record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    pub fn corrupt(key: &str, reason: impl ToString) -> Self {
        StoreError::Corrupt { key: key.to_string(), reason: reason.to_string() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type SharedStore = Arc<dyn KvStore>;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    /// Sets `key` to expire after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;
    /// Sets `key` with expiry only if absent. Returns whether it was set.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;
    async fn del(&self, keys: &[String]) -> StoreResult<()>;
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;
    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;
    async fn hset_many(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()>;
    /// Sets `field` only if absent. Returns whether it was set.
    async fn hset_nx(&self, key: &str, field: &str, value: &str) -> StoreResult<bool>;
    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()>;
    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    /// Returns whether `member` was newly added.
    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool>;
    /// Returns whether `member` was present and removed.
    async fn srem(&self, key: &str, member: &str) -> StoreResult<bool>;
    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;
    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool>;
    async fn scard(&self, key: &str) -> StoreResult<usize>;
}

//! Redis-backed store.

use std::collections::HashMap;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;

use super::{KvStore, StoreResult};

/// Store backed by a multiplexed, auto-reconnecting Redis connection.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("connected to redis");
        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

// Redis expiries have one-second resolution; never round down to zero.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.conn().get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _: () = self.conn().set(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let _: () = self.conn().set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let reply: Option<String> = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut self.conn())
            .await?;
        Ok(reply.is_some())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let _: () = self.conn().del(keys).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.conn().exists(key).await?)
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(self.conn().hget(key, field).await?)
    }

    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        Ok(self.conn().hgetall(key).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let _: () = self.conn().hset(key, field, value).await?;
        Ok(())
    }

    async fn hset_many(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let _: () = self.conn().hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn hset_nx(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        Ok(self.conn().hset_nx(key, field, value).await?)
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()> {
        let _: () = self.conn().hdel(key, field).await?;
        Ok(())
    }

    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        Ok(self.conn().hincr(key, field, delta).await?)
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        let added: i64 = self.conn().sadd(key, member).await?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let removed: i64 = self.conn().srem(key, member).await?;
        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(self.conn().smembers(key).await?)
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        Ok(self.conn().sismember(key, member).await?)
    }

    async fn scard(&self, key: &str) -> StoreResult<usize> {
        Ok(self.conn().scard(key).await?)
    }
}

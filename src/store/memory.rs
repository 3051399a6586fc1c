//! In-process store with per-key expiry.
//!
//! Used by tests and for local runs without Redis. Each command holds the
//! shard lock of its key for its whole duration, which gives the same
//! single-key atomicity Redis does. Expiry is lazy and measured on the tokio
//! clock, so paused-time tests can move past a TTL with
//! `tokio::time::advance`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{KvStore, StoreError, StoreResult};

#[derive(Debug)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
}

impl Value {
    fn is_empty_collection(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::Hash(h) => h.is_empty(),
            Value::Set(s) => s.is_empty(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: Value) -> Self {
        Self { value, expires_at: None }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<String, Slot>>,
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::corrupt(key, "operation against a key holding the wrong kind of value")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `f` to the live value at `key`, if any.
    fn read<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Value) -> StoreResult<T>,
    ) -> StoreResult<Option<T>> {
        let now = Instant::now();
        let expired = match self.data.get(key) {
            Some(slot) if slot.is_live(now) => return f(&slot.value).map(Some),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.data.remove_if(key, |_, slot| !slot.is_live(now));
        }
        Ok(None)
    }

    /// Applies `f` to the value at `key`, creating it with `init` when absent
    /// or expired. Collections left empty are dropped, as Redis does.
    fn upsert<T>(
        &self,
        key: &str,
        init: impl FnOnce() -> Value,
        f: impl FnOnce(&mut Value) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let now = Instant::now();
        let out = {
            let mut slot = self
                .data
                .entry(key.to_string())
                .or_insert_with(|| Slot::new(Value::Set(BTreeSet::new())));
            if !slot.is_live(now) || slot.value.is_empty_collection() {
                *slot = Slot::new(init());
            }
            f(&mut slot.value)
        };
        self.data.remove_if(key, |_, slot| slot.value.is_empty_collection());
        out
    }

    fn hash_upsert<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, String>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.upsert(key, || Value::Hash(HashMap::new()), |value| match value {
            Value::Hash(hash) => f(hash),
            _ => Err(wrong_type(key)),
        })
    }

    fn set_upsert<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut BTreeSet<String>) -> T,
    ) -> StoreResult<T> {
        self.upsert(key, || Value::Set(BTreeSet::new()), |value| match value {
            Value::Set(set) => Ok(f(set)),
            _ => Err(wrong_type(key)),
        })
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.read(key, |value| match value {
            Value::Str(s) => Ok(s.clone()),
            _ => Err(wrong_type(key)),
        })
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data.insert(key.to_string(), Slot::new(Value::Str(value.to_string())));
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let slot = Slot {
            value: Value::Str(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        };
        self.data.insert(key.to_string(), slot);
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let mut slot = self.data.entry(key.to_string()).or_insert_with(|| Slot {
            value: Value::Str(String::new()),
            expires_at: Some(now),
        });
        if slot.is_live(now) {
            return Ok(false);
        }
        *slot = Slot {
            value: Value::Str(value.to_string()),
            expires_at: Some(now + ttl),
        };
        Ok(true)
    }

    async fn del(&self, keys: &[String]) -> StoreResult<()> {
        for key in keys {
            self.data.remove(key);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.read(key, |_| Ok(()))?.is_some())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let found = self.read(key, |value| match value {
            Value::Hash(hash) => Ok(hash.get(field).cloned()),
            _ => Err(wrong_type(key)),
        })?;
        Ok(found.flatten())
    }

    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let found = self.read(key, |value| match value {
            Value::Hash(hash) => Ok(hash.clone()),
            _ => Err(wrong_type(key)),
        })?;
        Ok(found.unwrap_or_default())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.hash_upsert(key, |hash| {
            hash.insert(field.to_string(), value.to_string());
            Ok(())
        })
    }

    async fn hset_many(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        self.hash_upsert(key, |hash| {
            for (field, value) in fields {
                hash.insert(field.to_string(), value.clone());
            }
            Ok(())
        })
    }

    async fn hset_nx(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        self.hash_upsert(key, |hash| {
            if hash.contains_key(field) {
                return Ok(false);
            }
            hash.insert(field.to_string(), value.to_string());
            Ok(true)
        })
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()> {
        self.hash_upsert(key, |hash| {
            hash.remove(field);
            Ok(())
        })
    }

    async fn hincr_by(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.hash_upsert(key, |hash| {
            let current = match hash.get(field) {
                Some(raw) => raw
                    .parse::<i64>()
                    .map_err(|e| StoreError::corrupt(key, format!("{field}: {e}")))?,
                None => 0,
            };
            let next = current + delta;
            hash.insert(field.to_string(), next.to_string());
            Ok(next)
        })
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.set_upsert(key, |set| set.insert(member.to_string()))
    }

    async fn srem(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.set_upsert(key, |set| set.remove(member))
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let found = self.read(key, |value| match value {
            Value::Set(set) => Ok(set.iter().cloned().collect()),
            _ => Err(wrong_type(key)),
        })?;
        Ok(found.unwrap_or_default())
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let found = self.read(key, |value| match value {
            Value::Set(set) => Ok(set.contains(member)),
            _ => Err(wrong_type(key)),
        })?;
        Ok(found.unwrap_or(false))
    }

    async fn scard(&self, key: &str) -> StoreResult<usize> {
        let found = self.read(key, |value| match value {
            Value::Set(set) => Ok(set.len()),
            _ => Err(wrong_type(key)),
        })?;
        Ok(found.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn keys_expire_on_the_tokio_clock() {
        let store = MemoryStore::new();
        store.set_ex("hb", "1", Duration::from_secs(30)).await.unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(store.exists("hb").await.unwrap());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!store.exists("hb").await.unwrap());
        assert_eq!(store.get("hb").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn set_nx_ex_acts_as_a_lease() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(10);
        assert!(store.set_nx_ex("lease", "a", ttl).await.unwrap());
        assert!(!store.set_nx_ex("lease", "b", ttl).await.unwrap());
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.set_nx_ex("lease", "c", ttl).await.unwrap());
        assert_eq!(store.get("lease").await.unwrap().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn sets_report_membership_changes() {
        let store = MemoryStore::new();
        assert!(store.sadd("s", "alice").await.unwrap());
        assert!(!store.sadd("s", "alice").await.unwrap());
        assert!(store.sadd("s", "bob").await.unwrap());
        assert_eq!(store.scard("s").await.unwrap(), 2);
        assert!(store.srem("s", "alice").await.unwrap());
        assert!(!store.srem("s", "alice").await.unwrap());
        assert!(store.srem("s", "bob").await.unwrap());
        // empty sets disappear
        assert!(!store.exists("s").await.unwrap());
        assert!(!store.srem("missing", "x").await.unwrap());
    }

    #[tokio::test]
    async fn hashes_support_conditional_set_and_increment() {
        let store = MemoryStore::new();
        assert!(store.hset_nx("h", "winner", "alice").await.unwrap());
        assert!(!store.hset_nx("h", "winner", "bob").await.unwrap());
        assert_eq!(store.hget("h", "winner").await.unwrap().as_deref(), Some("alice"));
        assert_eq!(store.hincr_by("h", "score", 2).await.unwrap(), 2);
        assert_eq!(store.hincr_by("h", "score", 1).await.unwrap(), 3);
        store.hdel("h", "winner").await.unwrap();
        assert_eq!(store.hget("h", "winner").await.unwrap(), None);
        assert_eq!(store.hget_all("h").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_kind_of_value_is_an_error() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert!(matches!(store.sadd("k", "x").await, Err(StoreError::Corrupt { .. })));
        store.hset("h", "n", "abc").await.unwrap();
        assert!(matches!(store.hincr_by("h", "n", 1).await, Err(StoreError::Corrupt { .. })));
    }
}

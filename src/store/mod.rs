//! Production [`KvStore`](crate::ports::KvStore) adapter.
//!
//! Cross-process persistence after downtime is an explicit non-goal, so this
//! adapter keeps state in-process behind [`DashMap`] rather than reaching
//! for an external store — the same trade-off [`crate::cache::memory`]
//! makes for the hot/warm cache tiers.
//! A key or set member is lazily evicted the first time it is read after
//! its TTL elapses.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::Result;
use crate::ports::KvStore;

struct ValueEntry {
    value: String,
    expires_at: Option<Instant>,
}

struct SetEntry {
    members: HashSet<String>,
    expires_at: Option<Instant>,
}

fn is_live(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_none_or(|deadline| deadline > now)
}

/// In-process [`KvStore`] backed by [`DashMap`], used for cooldown claims,
/// the `no_data_pair` negative cache, the fourmeme allow/deny sets, and the
/// published `MonitorConfig` snapshot.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    values: DashMap<String, ValueEntry>,
    sets: DashMap<String, SetEntry>,
}

impl std::fmt::Debug for ValueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueEntry").field("value", &self.value).finish()
    }
}

impl std::fmt::Debug for SetEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetEntry").field("len", &self.members.len()).finish()
    }
}

impl InMemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    #[instrument(skip(self, value))]
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut created = false;
        self.values
            .entry(key.to_string())
            .and_modify(|entry| {
                if !is_live(entry.expires_at, now) {
                    entry.value = value.to_string();
                    entry.expires_at = Some(now + ttl);
                    created = true;
                }
            })
            .or_insert_with(|| {
                created = true;
                ValueEntry { value: value.to_string(), expires_at: Some(now + ttl) }
            });
        Ok(created)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        Ok(self.values.get(key).and_then(|entry| {
            if is_live(entry.expires_at, now) {
                Some(entry.value.clone())
            } else {
                None
            }
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.values.insert(key.to_string(), ValueEntry { value: value.to_string(), expires_at });
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entry = self.sets.entry(key.to_string()).or_insert_with(|| SetEntry {
            members: HashSet::new(),
            expires_at: Some(now + ttl),
        });
        if !is_live(entry.expires_at, now) {
            entry.members.clear();
        }
        entry.members.insert(member.to_string());
        entry.expires_at = Some(now + ttl);
        Ok(())
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let now = Instant::now();
        Ok(self.sets.get(key).is_some_and(|entry| is_live(entry.expires_at, now) && entry.members.contains(member)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::thread::sleep;

    use super::*;

    #[tokio::test]
    async fn set_if_absent_only_succeeds_once_until_ttl_elapses() {
        let kv = InMemoryKvStore::new();
        assert!(kv.set_if_absent("k", "1", Duration::from_millis(20)).await.unwrap());
        assert!(!kv.set_if_absent("k", "1", Duration::from_secs(60)).await.unwrap());
        sleep(Duration::from_millis(40));
        assert!(kv.set_if_absent("k", "1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn get_returns_none_after_expiry() {
        let kv = InMemoryKvStore::new();
        kv.set("k", "v", Some(Duration::from_millis(10))).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some("v".to_string()));
        sleep(Duration::from_millis(30));
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_membership_round_trips() {
        let kv = InMemoryKvStore::new();
        assert!(!kv.set_contains("tokens", "0xabc").await.unwrap());
        kv.set_add("tokens", "0xabc", Duration::from_secs(60)).await.unwrap();
        assert!(kv.set_contains("tokens", "0xabc").await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let kv = InMemoryKvStore::new();
        kv.delete("missing").await.unwrap();
        kv.set("k", "v", None).await.unwrap();
        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }
}

//! Persistent key-value store port.
//!
//! Backs the fourmeme whitelist/blacklist, `no_data_pair` negative cache,
//! monitor config snapshot, cooldown keys, and the retry queue. The cooldown
//! claim is expressed as a single atomic operation, never read-then-write.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Port for the persistent key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically set `key` to `value` with `ttl`, only if `key` does not
    /// already exist. Returns `true` iff the key was created by this call.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Unconditionally delete `key`. Idempotent: deleting a missing key is
    /// not an error.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get the current value for `key`, or `None` if absent/expired.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set `key` to `value` with `ttl`, unconditionally.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Add `member` to the set at `key`, refreshing the set's TTL.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<()>;

    /// `true` if `member` is present in the set at `key`.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! In-memory `KvStore` mock for tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::{Duration, KvStore, Result, async_trait};

    #[derive(Debug, Default)]
    struct State {
        values: HashMap<String, String>,
        sets: HashMap<String, HashSet<String>>,
    }

    /// In-memory `KvStore` with no TTL expiry (tests advance a `FakeClock`
    /// separately and assert on `set_if_absent`/`delete` call behavior
    /// rather than on wall-clock expiry).
    #[derive(Debug, Default)]
    pub struct MockKvStore {
        state: Mutex<State>,
    }

    impl MockKvStore {
        /// Create an empty mock store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl KvStore for MockKvStore {
        async fn set_if_absent(&self, key: &str, value: &str, _ttl: Duration) -> Result<bool> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.values.contains_key(key) {
                return Ok(false);
            }
            state.values.insert(key.to_string(), value.to_string());
            Ok(true)
        }

        async fn delete(&self, key: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.values.remove(key);
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            Ok(state.values.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> Result<()> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.values.insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn set_add(&self, key: &str, member: &str, _ttl: Duration) -> Result<()> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .sets
                .entry(key.to_string())
                .or_default()
                .insert(member.to_string());
            Ok(())
        }

        async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            Ok(state
                .sets
                .get(key)
                .is_some_and(|set| set.contains(member)))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::mocks::MockKvStore;
    use super::*;

    #[tokio::test]
    async fn set_if_absent_only_succeeds_once() {
        let kv = MockKvStore::new();
        assert!(
            kv.set_if_absent("cooldown:token", "1", Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(
            !kv.set_if_absent("cooldown:token", "1", Duration::from_secs(60))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let kv = MockKvStore::new();
        kv.delete("missing").await.unwrap();
        kv.set_if_absent("k", "v", Duration::from_secs(1))
            .await
            .unwrap();
        kv.delete("k").await.unwrap();
        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_membership() {
        let kv = MockKvStore::new();
        assert!(
            !kv.set_contains("bsc:fourmeme_tokens", "0xabc")
                .await
                .unwrap()
        );
        kv.set_add("bsc:fourmeme_tokens", "0xabc", Duration::from_secs(604_800))
            .await
            .unwrap();
        assert!(
            kv.set_contains("bsc:fourmeme_tokens", "0xabc")
                .await
                .unwrap()
        );
    }
}

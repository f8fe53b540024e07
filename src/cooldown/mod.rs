//! Cooldown & dedup: per-token cooldown claims and transaction-level dedup.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::instrument;

use crate::error::Result;
use crate::ports::KvStore;

const COOLDOWN_KEY_PREFIX: &str = "bsc:cooldown:";
/// Dedup retention: a 10-minute TTL.
pub const DEDUP_TTL_SECS: i64 = 600;

fn cooldown_key(token: Address) -> String {
    format!("{COOLDOWN_KEY_PREFIX}{token:#x}")
}

/// Attempt to claim the cooldown slot for `token`.
///
/// Returns `true` iff the claim succeeded (the key was created). TTL is
/// `cooldown_seconds + U(0, jitter_seconds)`, enforcing at most one
/// admitted dispatch per token per cooldown interval.
///
/// # Errors
/// Returns an error if the KV store is unreachable.
#[instrument(skip(kv), fields(%token))]
pub async fn claim<K: KvStore>(kv: &K, token: Address, cooldown_seconds: u64, jitter_seconds: u64) -> Result<bool> {
    let jitter = if jitter_seconds == 0 { 0 } else { rand::rng().random_range(0..=jitter_seconds) };
    let ttl = StdDuration::from_secs(cooldown_seconds + jitter);
    kv.set_if_absent(&cooldown_key(token), "1", ttl).await
}

/// Release `token`'s cooldown unconditionally. Must be called on every
/// failure path after a successful [`claim`] (payload build, dispatch, or
/// notifier error) so the slot is free for the next admissible event.
/// Idempotent.
///
/// # Errors
/// Returns an error if the KV store is unreachable.
#[instrument(skip(kv), fields(%token))]
pub async fn release<K: KvStore>(kv: &K, token: Address) -> Result<()> {
    kv.delete(&cooldown_key(token)).await
}

/// In-memory, time-bounded set of seen `(tx_hash, log_index)` pairs, swept
/// lazily on insert so the retention window never grows unbounded.
#[derive(Debug, Default)]
pub struct SeenTx {
    seen: Mutex<HashMap<(B256, u64), DateTime<Utc>>>,
}

impl SeenTx {
    /// An empty dedup set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `(tx_hash, log_index)` as seen at `now` and report whether it
    /// was already present within the dedup TTL. Repeated submissions
    /// within the TTL are no-ops.
    pub fn check_and_insert(&self, tx_hash: B256, log_index: u64, now: DateTime<Utc>) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let cutoff = now - chrono::Duration::seconds(DEDUP_TTL_SECS);
        seen.retain(|_, ts| *ts >= cutoff);

        let key = (tx_hash, log_index);
        if seen.contains_key(&key) {
            true
        } else {
            seen.insert(key, now);
            false
        }
    }

    /// Number of entries currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// `true` if no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::ports::kv::mocks::MockKvStore;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn claim_succeeds_once_then_fails() {
        let kv = MockKvStore::new();
        let token = Address::from([1u8; 20]);
        assert!(claim(&kv, token, 180, 30).await.unwrap());
        assert!(!claim(&kv, token, 180, 30).await.unwrap());
    }

    #[tokio::test]
    async fn release_allows_reclaim() {
        let kv = MockKvStore::new();
        let token = Address::from([2u8; 20]);
        assert!(claim(&kv, token, 180, 30).await.unwrap());
        release(&kv, token).await.unwrap();
        assert!(claim(&kv, token, 180, 30).await.unwrap());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let kv = MockKvStore::new();
        let token = Address::from([3u8; 20]);
        release(&kv, token).await.unwrap();
        release(&kv, token).await.unwrap();
    }

    #[test]
    fn dedup_rejects_repeat_within_ttl() {
        let seen = SeenTx::new();
        let tx = B256::from([9u8; 32]);
        assert!(!seen.check_and_insert(tx, 0, t(0)));
        assert!(seen.check_and_insert(tx, 0, t(100)));
    }

    #[test]
    fn dedup_evicts_after_ttl() {
        let seen = SeenTx::new();
        let tx = B256::from([9u8; 32]);
        assert!(!seen.check_and_insert(tx, 0, t(0)));
        assert!(!seen.check_and_insert(tx, 0, t(DEDUP_TTL_SECS + 1)));
    }

    #[test]
    fn dedup_distinguishes_log_index() {
        let seen = SeenTx::new();
        let tx = B256::from([9u8; 32]);
        assert!(!seen.check_and_insert(tx, 0, t(0)));
        assert!(!seen.check_and_insert(tx, 1, t(0)));
    }
}

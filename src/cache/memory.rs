//! In-memory cache implementation using moka.
//!
//! Three tiers feed the [`Cache`] port:
//! 1. A small, unbounded-TTL hot LRU for pair metadata (≤1k entries, the
//!    working set of actively-traded pairs).
//! 2. A warm TTL map per kind (receipts 5 min, pair meta 1 h, WBNB price
//!    5 min, `no_data_pair` 10 min).
//! 3. The persistent KV store, which this layer does not touch directly —
//!    [`crate::resolve`] falls through to it on a warm-tier miss.
//!
//! Reads try hot, then warm, promoting a warm hit back into hot. Writes
//! populate both in-memory tiers. A cache never holds a partially-populated
//! entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, B256};
use moka::sync::Cache as MokaCache;

use crate::ports::{Cache, CacheStats};
use crate::types::entities::{PairMeta, ReceiptRecord};

const HOT_PAIR_META_MAX_CAPACITY: u64 = 1_000;
const WARM_PAIR_META_TTL: Duration = Duration::from_secs(3_600);
const RECEIPT_TTL: Duration = Duration::from_secs(300);
const WBNB_PRICE_TTL: Duration = Duration::from_secs(300);
const NO_DATA_PAIR_TTL: Duration = Duration::from_secs(600);

/// Moka/dashmap-backed implementation of the [`Cache`] port.
#[derive(Debug)]
pub struct MemoryCache {
    hot_pair_meta: MokaCache<Address, PairMeta>,
    warm_pair_meta: MokaCache<Address, PairMeta>,
    receipts: MokaCache<B256, ReceiptRecord>,
    wbnb_price: MokaCache<(), f64>,
    no_data_pairs: MokaCache<Address, ()>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    /// Build a cache with the prescribed TTLs and capacities.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hot_pair_meta: MokaCache::builder()
                .max_capacity(HOT_PAIR_META_MAX_CAPACITY)
                .build(),
            warm_pair_meta: MokaCache::builder()
                .time_to_live(WARM_PAIR_META_TTL)
                .build(),
            receipts: MokaCache::builder().time_to_live(RECEIPT_TTL).build(),
            wbnb_price: MokaCache::builder()
                .max_capacity(1)
                .time_to_live(WBNB_PRICE_TTL)
                .build(),
            no_data_pairs: MokaCache::builder()
                .time_to_live(NO_DATA_PAIR_TTL)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Cache for MemoryCache {
    fn get_receipt(&self, tx_hash: &B256) -> Option<ReceiptRecord> {
        let result = self.receipts.get(tx_hash);
        self.record(result.is_some());
        result
    }

    fn set_receipt(&self, tx_hash: B256, receipt: ReceiptRecord) {
        self.receipts.insert(tx_hash, receipt);
    }

    fn get_pair_meta(&self, pair: &Address) -> Option<PairMeta> {
        if let Some(meta) = self.hot_pair_meta.get(pair) {
            self.record(true);
            return Some(meta);
        }
        if let Some(meta) = self.warm_pair_meta.get(pair) {
            self.hot_pair_meta.insert(*pair, meta.clone());
            self.record(true);
            return Some(meta);
        }
        self.record(false);
        None
    }

    fn set_pair_meta(&self, pair: Address, meta: PairMeta) {
        self.hot_pair_meta.insert(pair, meta.clone());
        self.warm_pair_meta.insert(pair, meta);
    }

    fn invalidate_pair_meta(&self, pair: &Address) {
        self.hot_pair_meta.invalidate(pair);
        self.warm_pair_meta.invalidate(pair);
    }

    fn get_wbnb_price(&self) -> Option<f64> {
        let result = self.wbnb_price.get(&());
        self.record(result.is_some());
        result
    }

    fn set_wbnb_price(&self, price: f64) {
        self.wbnb_price.insert((), price);
    }

    fn is_no_data_pair(&self, pair: &Address) -> bool {
        self.no_data_pairs.contains_key(pair)
    }

    fn set_no_data_pair(&self, pair: Address) {
        self.no_data_pairs.insert(pair, ());
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn clear_all(&self) {
        self.hot_pair_meta.invalidate_all();
        self.warm_pair_meta.invalidate_all();
        self.receipts.invalidate_all();
        self.wbnb_price.invalidate_all();
        self.no_data_pairs.invalidate_all();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

//! Caching port for the in-memory hot/warm tiers.
//!
//! Reads try hot LRU, then warm TTL map, then the persistent KV store, then
//! the ultimate source. Writes populate all cheaper tiers. Caches never hold
//! partially-populated entries: a value is either present and valid, or
//! absent.

use alloy::primitives::{Address, B256};

use crate::types::entities::{PairMeta, ReceiptRecord};

/// Aggregate hit/miss counters for a cache tier, feeding the
/// `cache_hits{kind}` metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cache hits observed.
    pub hits: u64,
    /// Cache misses observed.
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a percentage in `[0, 100]`. Returns `0.0` when no
    /// lookups have been recorded.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Port for the in-memory cache layer (hot LRU + warm TTL tiers).
pub trait Cache: Send + Sync {
    /// Get a cached receipt by transaction hash.
    fn get_receipt(&self, tx_hash: &B256) -> Option<ReceiptRecord>;

    /// Cache a receipt.
    fn set_receipt(&self, tx_hash: B256, receipt: ReceiptRecord);

    /// Get cached pair metadata.
    fn get_pair_meta(&self, pair: &Address) -> Option<PairMeta>;

    /// Cache pair metadata.
    fn set_pair_meta(&self, pair: Address, meta: PairMeta);

    /// Invalidate cached pair metadata (e.g. after a resolution failure).
    fn invalidate_pair_meta(&self, pair: &Address);

    /// Get the cached WBNB/USD spot price, or `None` if no live quote has
    /// ever been cached.
    fn get_wbnb_price(&self) -> Option<f64>;

    /// Cache the WBNB/USD spot price.
    fn set_wbnb_price(&self, price: f64);

    /// `true` if `pair` is in the `no_data_pair` negative cache (an
    /// explicit tri-state cache, not a boolean flag).
    fn is_no_data_pair(&self, pair: &Address) -> bool;

    /// Record `pair` in the `no_data_pair` negative cache.
    fn set_no_data_pair(&self, pair: Address);

    /// Current hit/miss statistics, aggregated across all tiers.
    fn stats(&self) -> CacheStats;

    /// Clear all tiers. Used in tests and on explicit config refresh.
    fn clear_all(&self);
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Mock `Cache` implementation for tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::{Address, B256, Cache, CacheStats, PairMeta, ReceiptRecord};

    /// In-memory `Cache` mock with no TTL expiry, for unit tests that
    /// exercise single-flight and hit/miss behavior without real time.
    #[derive(Debug, Default)]
    pub struct MockCache {
        receipts: Mutex<HashMap<B256, ReceiptRecord>>,
        pair_meta: Mutex<HashMap<Address, PairMeta>>,
        wbnb_price: Mutex<Option<f64>>,
        no_data_pairs: Mutex<std::collections::HashSet<Address>>,
        hits: AtomicU64,
        misses: AtomicU64,
    }

    impl MockCache {
        /// Create an empty mock cache.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Cache for MockCache {
        fn get_receipt(&self, tx_hash: &B256) -> Option<ReceiptRecord> {
            let result = self
                .receipts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(tx_hash)
                .cloned();
            if result.is_some() {
                self.hits.fetch_add(1, Ordering::Relaxed);
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
            result
        }

        fn set_receipt(&self, tx_hash: B256, receipt: ReceiptRecord) {
            self.receipts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(tx_hash, receipt);
        }

        fn get_pair_meta(&self, pair: &Address) -> Option<PairMeta> {
            let result = self
                .pair_meta
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(pair)
                .cloned();
            if result.is_some() {
                self.hits.fetch_add(1, Ordering::Relaxed);
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
            result
        }

        fn set_pair_meta(&self, pair: Address, meta: PairMeta) {
            self.pair_meta
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(pair, meta);
        }

        fn invalidate_pair_meta(&self, pair: &Address) {
            self.pair_meta.lock().unwrap_or_else(|e| e.into_inner()).remove(pair);
        }

        fn get_wbnb_price(&self) -> Option<f64> {
            *self.wbnb_price.lock().unwrap_or_else(|e| e.into_inner())
        }

        fn set_wbnb_price(&self, price: f64) {
            *self.wbnb_price.lock().unwrap_or_else(|e| e.into_inner()) = Some(price);
        }

        fn is_no_data_pair(&self, pair: &Address) -> bool {
            self.no_data_pairs
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(pair)
        }

        fn set_no_data_pair(&self, pair: Address) {
            self.no_data_pairs
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(pair);
        }

        fn stats(&self) -> CacheStats {
            CacheStats {
                hits: self.hits.load(Ordering::Relaxed),
                misses: self.misses.load(Ordering::Relaxed),
            }
        }

        fn clear_all(&self) {
            self.receipts.lock().unwrap_or_else(|e| e.into_inner()).clear();
            self.pair_meta.lock().unwrap_or_else(|e| e.into_inner()).clear();
            *self.wbnb_price.lock().unwrap_or_else(|e| e.into_inner()) = None;
            self.no_data_pairs.lock().unwrap_or_else(|e| e.into_inner()).clear();
            self.hits.store(0, Ordering::Relaxed);
            self.misses.store(0, Ordering::Relaxed);
        }
    }
}

//! Metadata resolver: pair token identity, decimals, and launchpad
//! classification, via cache → RPC → persistent KV → external API,
//! serialized per pair by a single-flight lock.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use chrono::Duration as ChronoDuration;
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, Result};
use crate::ports::{Cache, Clock, KvStore, LaunchpadClassifier, ReceiptRpc};
use crate::types::entities::PairMeta;
use crate::types::primitives::LaunchpadClass;

const TOKEN0_SELECTOR: [u8; 4] = [0x0d, 0xfe, 0x16, 0x81];
const TOKEN1_SELECTOR: [u8; 4] = [0xd2, 0x12, 0x20, 0xa7];
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

const FOURMEME_SET_KEY: &str = "bsc:fourmeme_tokens";
const NON_FOURMEME_SET_KEY: &str = "bsc:non_fourmeme_tokens";
const CLASSIFICATION_TTL: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 3_600);

/// Resolves pair metadata, serializing concurrent resolution of the same
/// pair so only one caller does the RPC/HTTP work while the rest wait on
/// its result.
#[derive(Debug)]
pub struct MetadataResolver<C, R, L, K> {
    cache: Arc<C>,
    rpc: Arc<R>,
    classifier: Arc<L>,
    kv: Arc<K>,
    quote_assets: Vec<Address>,
    pair_meta_ttl: ChronoDuration,
    locks: DashMap<Address, Arc<AsyncMutex<()>>>,
}

impl<C, R, L, K> MetadataResolver<C, R, L, K>
where
    C: Cache,
    R: ReceiptRpc,
    L: LaunchpadClassifier,
    K: KvStore,
{
    /// Build a resolver. `quote_assets` lists the addresses treated as the
    /// base/quote side of a pair (WBNB/USDT/USDC on BSC).
    pub fn new(cache: Arc<C>, rpc: Arc<R>, classifier: Arc<L>, kv: Arc<K>, quote_assets: Vec<Address>) -> Self {
        Self {
            cache,
            rpc,
            classifier,
            kv,
            quote_assets,
            pair_meta_ttl: ChronoDuration::hours(1),
            locks: DashMap::new(),
        }
    }

    /// Resolve `pair`'s metadata, using the cached value if present and not
    /// stale.
    ///
    /// # Errors
    /// Returns `AppError::Resolve(_)` if the on-chain calls needed to
    /// identify `token0`/`token1`/decimals fail.
    #[instrument(skip(self, clock), fields(%pair))]
    pub async fn resolve_pair(&self, pair: Address, clock: &dyn Clock) -> Result<PairMeta> {
        let now = clock.now();
        if let Some(meta) = self.cache.get_pair_meta(&pair)
            && !meta.is_stale(now, self.pair_meta_ttl)
        {
            return Ok(meta);
        }

        let lock = self
            .locks
            .entry(pair)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check after acquiring the lock: another task may have just
        // populated the cache while we waited.
        let now = clock.now();
        if let Some(meta) = self.cache.get_pair_meta(&pair)
            && !meta.is_stale(now, self.pair_meta_ttl)
        {
            return Ok(meta);
        }

        let meta = self.resolve_uncached(pair, now).await?;
        self.cache.set_pair_meta(pair, meta.clone());
        Ok(meta)
    }

    async fn resolve_uncached(&self, pair: Address, now: chrono::DateTime<chrono::Utc>) -> Result<PairMeta> {
        let token0 = self.call_address(pair, &TOKEN0_SELECTOR).await?;
        let token1 = self.call_address(pair, &TOKEN1_SELECTOR).await?;
        let decimals0 = self.call_decimals(token0).await?;
        let decimals1 = self.call_decimals(token1).await?;

        let target = self.target_token(token0, token1);
        let classification = self.classify(target).await;

        Ok(PairMeta {
            pair,
            token0,
            token1,
            decimals0,
            decimals1,
            is_fourmeme_launchpad: classification,
            last_resolved_at: now,
        })
    }

    /// `token0` if it's not a recognized quote asset, else `token1`. Falls
    /// back to `token1` when neither side is recognized (can't tell which
    /// is the target; treat `token1` as the target by convention).
    fn target_token(&self, token0: Address, token1: Address) -> Address {
        if self.quote_assets.contains(&token0) {
            token1
        } else {
            token0
        }
    }

    async fn call_address(&self, pair: Address, selector: &[u8; 4]) -> Result<Address> {
        let data = Bytes::copy_from_slice(selector);
        let result = self
            .rpc
            .eth_call(pair, data, None)
            .await
            .map_err(|e| AppError::Resolve(format!("eth_call failed for {pair}: {e}")))?;
        if result.len() < 32 {
            return Err(AppError::Resolve(format!("short eth_call result for {pair}")));
        }
        Ok(Address::from_slice(&result[result.len() - 20..]))
    }

    async fn call_decimals(&self, token: Address) -> Result<u8> {
        let data = Bytes::copy_from_slice(&DECIMALS_SELECTOR);
        let result = self
            .rpc
            .eth_call(token, data, None)
            .await
            .map_err(|e| AppError::Resolve(format!("eth_call(decimals) failed for {token}: {e}")))?;
        let decimals = result.last().copied().unwrap_or(18);
        if decimals > 36 {
            return Err(AppError::Resolve(format!("token {token} reports implausible decimals: {decimals}")));
        }
        Ok(decimals)
    }

    /// Check persistent whitelist → blacklist → external API, in that
    /// order, caching the outcome persistently once known.
    async fn classify(&self, token: Address) -> LaunchpadClass {
        let addr = format!("{token:#x}");

        match self.kv.set_contains(FOURMEME_SET_KEY, &addr).await {
            Ok(true) => return LaunchpadClass::Fourmeme,
            Ok(false) => {}
            Err(e) => warn!(%token, error = %e, "kv lookup failed during classification"),
        }
        match self.kv.set_contains(NON_FOURMEME_SET_KEY, &addr).await {
            Ok(true) => return LaunchpadClass::NotFourmeme,
            Ok(false) => {}
            Err(e) => warn!(%token, error = %e, "kv lookup failed during classification"),
        }

        match self.classifier.is_fourmeme(token).await {
            Ok(is_fourmeme) => {
                let (key, class) = if is_fourmeme {
                    (FOURMEME_SET_KEY, LaunchpadClass::Fourmeme)
                } else {
                    (NON_FOURMEME_SET_KEY, LaunchpadClass::NotFourmeme)
                };
                if let Err(e) = self.kv.set_add(key, &addr, CLASSIFICATION_TTL).await {
                    warn!(%token, error = %e, "failed to persist launchpad classification");
                }
                class
            }
            Err(e) => {
                debug!(%token, error = %e, "launchpad classifier unavailable, leaving unknown");
                LaunchpadClass::Unknown
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ports::cache::mocks::MockCache;
    use crate::ports::clock::FakeClock;
    use crate::ports::http_apis::mocks::MockLaunchpadClassifier;
    use crate::ports::kv::mocks::MockKvStore;
    use crate::ports::rpc::mocks::MockReceiptRpc;

    fn address_result(addr: Address) -> Bytes {
        let mut buf = [0u8; 32];
        buf[12..].copy_from_slice(addr.as_slice());
        Bytes::copy_from_slice(&buf)
    }

    fn decimals_result(decimals: u8) -> Bytes {
        let mut buf = [0u8; 32];
        buf[31] = decimals;
        Bytes::copy_from_slice(&buf)
    }

    #[tokio::test]
    async fn resolves_pair_and_caches_result() {
        let cache = Arc::new(MockCache::new());
        let rpc = Arc::new(MockReceiptRpc::new());
        let classifier = Arc::new(MockLaunchpadClassifier::new());
        let kv = Arc::new(MockKvStore::new());
        let clock = FakeClock::epoch();

        let wbnb = Address::from([0xBBu8; 20]);
        let pair = Address::from([0xCCu8; 20]);

        // The mock keys eth_call results by `to` only (not calldata), so
        // both token0()/token1() against `pair` resolve to the same value
        // here; that's enough to exercise the resolve-and-cache path.
        rpc.set_eth_call_result(pair, address_result(wbnb));
        rpc.set_eth_call_result(wbnb, decimals_result(18));

        let resolver = MetadataResolver::new(
            cache.clone(),
            rpc,
            classifier,
            kv,
            vec![wbnb],
        );

        let meta = resolver.resolve_pair(pair, &clock).await.unwrap();
        assert_eq!(meta.decimals0, 18);
        assert!(cache.get_pair_meta(&pair).is_some());
    }

    #[tokio::test]
    async fn classification_persists_to_kv_on_first_lookup() {
        let cache = Arc::new(MockCache::new());
        let rpc = Arc::new(MockReceiptRpc::new());
        let classifier = Arc::new(MockLaunchpadClassifier::new());
        let kv = Arc::new(MockKvStore::new());

        let token = Address::from([7u8; 20]);
        classifier.set_classification(token, true);

        let resolver = MetadataResolver::new(cache, rpc, classifier, kv.clone(), vec![]);
        let class = resolver.classify(token).await;
        assert_eq!(class, LaunchpadClass::Fourmeme);
        assert!(
            kv.set_contains(FOURMEME_SET_KEY, &format!("{token:#x}"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn classification_falls_back_to_whitelist_without_calling_classifier() {
        let cache = Arc::new(MockCache::new());
        let rpc = Arc::new(MockReceiptRpc::new());
        let classifier = Arc::new(MockLaunchpadClassifier::new());
        let kv = Arc::new(MockKvStore::new());

        let token = Address::from([8u8; 20]);
        kv.set_add(
            FOURMEME_SET_KEY,
            &format!("{token:#x}"),
            CLASSIFICATION_TTL,
        )
        .await
        .unwrap();

        let resolver = MetadataResolver::new(cache, rpc, classifier, kv, vec![]);
        assert_eq!(resolver.classify(token).await, LaunchpadClass::Fourmeme);
    }

    #[test]
    fn target_token_prefers_non_quote_side() {
        let resolver = MetadataResolver::new(
            Arc::new(MockCache::new()),
            Arc::new(MockReceiptRpc::new()),
            Arc::new(MockLaunchpadClassifier::new()),
            Arc::new(MockKvStore::new()),
            vec![Address::from([1u8; 20])],
        );
        let quote = Address::from([1u8; 20]);
        let target = Address::from([2u8; 20]);
        assert_eq!(resolver.target_token(quote, target), target);
        assert_eq!(resolver.target_token(target, quote), target);
    }
}

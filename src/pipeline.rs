//! Event pipeline: decode → resolve → Layer-1 → Layer-2 → cooldown →
//! dispatch, for a single routed log.
//!
//! Generic over every port the way [`crate::resolve::MetadataResolver`] is,
//! so tests can swap every collaborator for a mock and exercise the full
//! admission chain without any network I/O.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use alloy::primitives::Address;
use dashmap::DashMap;
use tracing::{info, instrument, warn};

use crate::config::MonitorConfigHandle;
use crate::cooldown::{self, SeenTx};
use crate::dispatch::DispatchPool;
use crate::error::Result;
use crate::filter::{evaluate_layer1, evaluate_layer2, usd_value, Layer2Outcome};
use crate::observability;
use crate::ports::{AlertPayload, Cache, Clock, KvStore, LaunchpadClassifier, Notifier, ReceiptRpc, RetryQueueStore, StatsApi};
use crate::resolve::MetadataResolver;
use crate::subscribe::RoutedLog;
use crate::types::entities::CumulativeWindow;
use crate::wire::DecodedEvent;
use crate::wire::decode_log;

/// Wires every port together to process one [`RoutedLog`] end to end.
pub struct EventPipeline<C, R, L, K, S, N, Rq> {
    resolver: MetadataResolver<C, R, L, K>,
    cache: Arc<C>,
    rpc: Arc<R>,
    kv: Arc<K>,
    stats_api: Arc<S>,
    notifier: Arc<N>,
    retry_queue: Arc<Rq>,
    clock: Arc<dyn Clock>,
    dispatch_pool: Arc<DispatchPool>,
    seen_tx: SeenTx,
    cumulative: DashMap<Address, StdMutex<CumulativeWindow>>,
    config: MonitorConfigHandle,
    stablecoins: Vec<Address>,
    wbnb: Address,
}

impl<C, R, L, K, S, N, Rq> EventPipeline<C, R, L, K, S, N, Rq>
where
    C: Cache,
    R: ReceiptRpc,
    L: LaunchpadClassifier,
    K: KvStore,
    S: StatsApi,
    N: Notifier,
    Rq: RetryQueueStore,
{
    /// Build a pipeline from its collaborators.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        resolver: MetadataResolver<C, R, L, K>,
        cache: Arc<C>,
        rpc: Arc<R>,
        kv: Arc<K>,
        stats_api: Arc<S>,
        notifier: Arc<N>,
        retry_queue: Arc<Rq>,
        clock: Arc<dyn Clock>,
        dispatch_pool: Arc<DispatchPool>,
        config: MonitorConfigHandle,
        stablecoins: Vec<Address>,
        wbnb: Address,
    ) -> Self {
        Self {
            resolver,
            cache,
            rpc,
            kv,
            stats_api,
            notifier,
            retry_queue,
            clock,
            dispatch_pool,
            seen_tx: SeenTx::new(),
            cumulative: DashMap::new(),
            config,
            stablecoins,
            wbnb,
        }
    }

    /// Which of `meta.token0`/`meta.token1` is the traded (non-quote) side.
    fn target_token(&self, token0: Address, token1: Address) -> Address {
        if token0 == self.wbnb || self.stablecoins.contains(&token0) {
            token1
        } else {
            token0
        }
    }

    /// Process one routed log. Never errors on expected rejections
    /// (filter/cooldown misses); only infra failures propagate.
    ///
    /// # Errors
    /// Returns an error if metadata resolution, statistics retrieval, or
    /// alert dispatch fails for an infrastructure reason.
    #[instrument(skip(self, routed), fields(group = routed.group_index))]
    pub async fn process(&self, routed: RoutedLog) -> Result<()> {
        crate::observability::record_message_received();

        let Some(decoded) = decode_log(&routed.log)? else {
            return Ok(());
        };

        let event = match decoded {
            DecodedEvent::Swap(event) => event,
            DecodedEvent::Graduated { pair, .. } => {
                self.cache.invalidate_pair_meta(&pair);
                return Ok(());
            }
            DecodedEvent::Transfer { .. } => return Ok(()),
        };

        let now = self.clock.now();
        if self.seen_tx.check_and_insert(event.tx_hash, event.log_index, now) {
            return Ok(());
        }

        let meta = self.resolver.resolve_pair(event.pair, self.clock.as_ref()).await?;
        let token = self.target_token(meta.token0, meta.token1);
        let wbnb_price = self.cache.get_wbnb_price();
        let usd = usd_value(&event, &meta, &self.stablecoins, self.wbnb, wbnb_price);

        let config = self.config.current();

        let layer1 = {
            let entry = self.cumulative.entry(token).or_insert_with(|| StdMutex::new(CumulativeWindow::new()));
            let mut window = entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            evaluate_layer1(event.origin, usd, &config, &mut window, now)
        };
        if !layer1.admitted() {
            return Ok(());
        }
        crate::observability::record_layer1_pass(event.origin.label());

        crate::observability::record_layer2_check(event.origin.label());
        let layer2 = evaluate_layer2(
            token,
            event.pair,
            event.origin,
            meta.is_fourmeme_launchpad,
            &config.layer2_rules,
            self.stats_api.as_ref(),
            self.cache.as_ref(),
        )
        .await?;

        let Layer2Outcome::Admit { stat, .. } = layer2 else {
            return Ok(());
        };
        crate::observability::record_layer2_pass(event.origin.label());

        match self.rpc.get_receipt(event.tx_hash).await? {
            Some(receipt) if receipt.status => {}
            Some(_) => {
                observability::record_receipt_reverted();
                return Ok(());
            }
            None => {
                observability::record_receipt_pending();
                return Ok(());
            }
        }

        if !cooldown::claim(self.kv.as_ref(), token, config.cooldown_seconds, config.jitter_seconds).await? {
            return Ok(());
        }

        let payload = AlertPayload {
            chat_id: "default".into(),
            text: format!(
                "{token:#x} usd={:.2} price_change={:.2}% volume={:.2} top10={:.1}%",
                usd.value(),
                stat.price_change_pct,
                stat.volume_usd,
                stat.top10_pct
            ),
            buttons: vec![format!("https://bscscan.com/address/{token:#x}")],
        };

        match self.dispatch_pool.dispatch(self.notifier.as_ref(), self.retry_queue.as_ref(), self.kv.as_ref(), token, payload).await {
            Ok(()) => {
                crate::observability::record_alert("success");
                info!(%token, "alert dispatched");
            }
            Err(e) => {
                crate::observability::record_alert("failure");
                warn!(%token, error = %e, "alert dispatch failed");
                return Err(e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::{B256, Bytes, U256};

    use super::*;
    use crate::abi::pancake_v2;
    use crate::dispatch::DispatchPool;
    use crate::ports::cache::mocks::MockCache;
    use crate::ports::clock::FakeClock;
    use crate::ports::http_apis::mocks::{MockLaunchpadClassifier, MockStatsApi};
    use crate::ports::kv::mocks::MockKvStore;
    use crate::ports::notifier::mocks::{MockNotifier, MockRetryQueueStore};
    use crate::ports::rpc::mocks::MockReceiptRpc;
    use crate::types::entities::{Layer2Rule, Layer2Template, MonitorConfig, PriceCompleteness, PriceStat, ReceiptRecord, RuleTrigger, Window};
    use alloy::sol_types::SolEvent;

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

    fn config_json(rules: Vec<Layer2Rule>) -> String {
        let config = MonitorConfig {
            min_usd_internal: 100.0,
            min_usd_external: 100.0,
            cumulative_min_usd: 1_000.0,
            cumulative_window_secs: 300,
            layer2_rules: Layer2Template { starting_window: Window::OneMinute, rules, trigger: RuleTrigger::Any },
            cooldown_seconds: 60,
            jitter_seconds: 0,
        };
        serde_json::to_string(&config).unwrap()
    }

    async fn build_pipeline(
        rules: Vec<Layer2Rule>,
    ) -> (
        EventPipeline<MockCache, MockReceiptRpc, MockLaunchpadClassifier, MockKvStore, MockStatsApi, MockNotifier, MockRetryQueueStore>,
        Arc<MockNotifier>,
        Address,
    ) {
        let cache = Arc::new(MockCache::new());
        let rpc = Arc::new(MockReceiptRpc::new());
        let classifier = Arc::new(MockLaunchpadClassifier::new());
        let kv = Arc::new(MockKvStore::new());
        let stats_api = Arc::new(MockStatsApi::new());
        let notifier = Arc::new(MockNotifier::new());
        let retry_queue = Arc::new(MockRetryQueueStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::epoch());

        let wbnb = Address::from([0xBBu8; 20]);
        let pair = Address::from([0xCCu8; 20]);

        // The mock keys eth_call results by `to` only, so both token0()/
        // token1() against `pair` resolve to wbnb here; enough to exercise
        // the admission chain without a real pair on the other side.
        rpc.set_eth_call_result(pair, address_result(wbnb));
        rpc.set_eth_call_result(wbnb, decimals_result(18));

        kv.set(crate::config::MONITOR_CONFIG_KEY, &config_json(rules), None).await.unwrap();
        let config_handle = MonitorConfigHandle::load(&*kv).await.unwrap();

        let resolver = MetadataResolver::new(cache.clone(), rpc.clone(), classifier, kv.clone(), vec![wbnb]);
        let dispatch_pool = Arc::new(DispatchPool::new(4));

        let pipeline = EventPipeline::new(
            resolver,
            cache,
            rpc,
            kv,
            stats_api,
            notifier.clone(),
            retry_queue,
            clock,
            dispatch_pool,
            config_handle,
            vec![],
            wbnb,
        );
        (pipeline, notifier, pair)
    }

    fn swap_log(pair: Address, amount0_in_wei: U256) -> RoutedLog {
        let event = pancake_v2::Swap {
            sender: Address::from([1u8; 20]),
            amount0In: amount0_in_wei,
            amount1In: U256::ZERO,
            amount0Out: U256::ZERO,
            amount1Out: U256::from(1u64),
            to: Address::from([2u8; 20]),
        };
        let log = crate::wire::RawLog {
            address: pair,
            topics: vec![
                pancake_v2::Swap::SIGNATURE_HASH,
                B256::left_padding_from(event.sender.as_slice()),
                B256::left_padding_from(event.to.as_slice()),
            ],
            data: Bytes::from(event.encode_data()),
            block_number: 100,
            transaction_hash: B256::from([9u8; 32]),
            log_index: 0,
        };
        RoutedLog { group_index: 0, log }
    }

    /// 0.1 WBNB at the $600 fallback price is $60, under every threshold
    /// used below; kept small enough to stay under `cumulative_min_usd` too.
    fn small_amount() -> U256 {
        U256::from(10u64).pow(U256::from(17u64))
    }

    /// 1 WBNB at the $600 fallback price is $600, clearing every per-origin
    /// minimum configured below.
    fn large_amount() -> U256 {
        U256::from(10u64).pow(U256::from(18u64))
    }

    #[tokio::test]
    async fn swap_below_usd_threshold_is_not_dispatched() {
        let (pipeline, notifier, pair) = build_pipeline(vec![Layer2Rule::PriceRise { threshold_pct: 10.0 }]).await;
        pipeline.process(swap_log(pair, small_amount())).await.unwrap();
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn admitted_swap_with_no_launchpad_classification_blocks_layer2() {
        let (pipeline, notifier, pair) = build_pipeline(vec![Layer2Rule::Volume { threshold_usd: 1.0 }]).await;
        // External origin (PancakeSwap) + Unknown classification => NotClassified, never dispatched.
        pipeline.process(swap_log(pair, large_amount())).await.unwrap();
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn fully_admitted_fourmeme_whitelisted_swap_dispatches_and_claims_cooldown() {
        let cache = Arc::new(MockCache::new());
        let rpc = Arc::new(MockReceiptRpc::new());
        let classifier = Arc::new(MockLaunchpadClassifier::new());
        let kv = Arc::new(MockKvStore::new());
        let stats_api = Arc::new(MockStatsApi::new());
        let notifier = Arc::new(MockNotifier::new());
        let retry_queue = Arc::new(MockRetryQueueStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::epoch());

        let wbnb = Address::from([0xBBu8; 20]);
        let pair = Address::from([0xCCu8; 20]);

        rpc.set_eth_call_result(pair, address_result(wbnb));
        rpc.set_eth_call_result(wbnb, decimals_result(18));

        // Pre-whitelist the (degenerate) target token so External-origin
        // Layer-2 evaluation is not skipped as `NotClassified`.
        kv.set_add("bsc:fourmeme_tokens", &format!("{wbnb:#x}"), std::time::Duration::from_secs(3600)).await.unwrap();

        stats_api.set_stats(
            wbnb,
            Window::OneMinute,
            PriceStat {
                token: wbnb,
                window: Window::OneMinute,
                price_change_pct: 25.0,
                volume_usd: 5_000.0,
                tx_count: 10,
                top10_pct: 10.0,
                updated_at: chrono::Utc::now(),
                completeness: PriceCompleteness::Complete,
            },
        );

        let log = swap_log(pair, large_amount());
        rpc.set_receipt(log.log.transaction_hash, ReceiptRecord { tx_hash: log.log.transaction_hash, logs: vec![], status: true, gas_used: 21_000 });

        kv.set(
            crate::config::MONITOR_CONFIG_KEY,
            &config_json(vec![Layer2Rule::PriceRise { threshold_pct: 10.0 }]),
            None,
        )
        .await
        .unwrap();
        let config_handle = MonitorConfigHandle::load(&*kv).await.unwrap();
        let resolver = MetadataResolver::new(cache.clone(), rpc.clone(), classifier, kv.clone(), vec![wbnb]);
        let dispatch_pool = Arc::new(DispatchPool::new(4));

        let pipeline = EventPipeline::new(
            resolver,
            cache,
            rpc,
            kv.clone(),
            stats_api,
            notifier.clone(),
            retry_queue,
            clock,
            dispatch_pool,
            config_handle,
            vec![],
            wbnb,
        );

        pipeline.process(log).await.unwrap();
        assert_eq!(notifier.count(), 1);
        assert!(kv.get(&format!("bsc:cooldown:{wbnb:#x}")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_log_index_is_processed_once() {
        let (pipeline, _notifier, pair) = build_pipeline(vec![]).await;
        let log = swap_log(pair, small_amount());
        pipeline.process(log.clone()).await.unwrap();
        pipeline.process(log).await.unwrap();
        // both calls succeed (Ok) regardless of admission; dedup is exercised
        // directly in cooldown::tests, this just checks no panic/error path.
    }
}

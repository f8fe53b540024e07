//! Cache- and KV-resident domain entities.
//!
//! These structs represent state that outlives a single event: pair
//! metadata, cached receipts, price statistics, the per-token cumulative
//! window, cooldowns, and the seen-transaction dedup set.

use std::collections::VecDeque;

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::primitives::{LaunchpadClass, UsdAmount};

// ═══════════════════════════════════════════════════════════════════════════════
// PAIR META
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolved metadata for a DEX pair, mutated only by the metadata resolver
/// under a per-pair single-flight guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMeta {
    /// The pair contract address.
    pub pair: Address,
    /// `token0` of the pair.
    pub token0: Address,
    /// `token1` of the pair.
    pub token1: Address,
    /// `token0` decimals.
    pub decimals0: u8,
    /// `token1` decimals.
    pub decimals1: u8,
    /// Fourmeme launchpad classification (tri-state).
    pub is_fourmeme_launchpad: LaunchpadClass,
    /// When this record was last (re)resolved.
    pub last_resolved_at: DateTime<Utc>,
}

impl PairMeta {
    /// Returns `true` if `last_resolved_at` is older than `ttl`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.last_resolved_at > ttl
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECEIPT RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// A cached transaction receipt, keyed by `tx_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Raw log topics/data for each log in the receipt, as returned by the
    /// node (kept opaque here; decoding happens in the wire decoder).
    pub logs: Vec<serde_json::Value>,
    /// `true` if the transaction succeeded (status = 0x1).
    pub status: bool,
    /// Gas used by the transaction.
    pub gas_used: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE STAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Completeness of a `PriceStat` fetch for a given window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceCompleteness {
    /// Full statistics are available for the requested window.
    Complete,
    /// Partial statistics; some fields may be missing or low-confidence.
    Partial,
    /// No data at all for the requested window; triggers fallback widening.
    Empty,
}

/// A configured statistics time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    /// One minute.
    OneMinute,
    /// Five minutes.
    FiveMinutes,
    /// One hour.
    OneHour,
}

impl Window {
    /// The next wider window per the fallback map `{1m->5m, 5m->1h}`.
    /// Returns `None` if there is no wider window left.
    #[must_use]
    pub const fn widen(self) -> Option<Self> {
        match self {
            Self::OneMinute => Some(Self::FiveMinutes),
            Self::FiveMinutes => Some(Self::OneHour),
            Self::OneHour => None,
        }
    }

    /// The query-string interval value this window maps to, per the
    /// statistics API contract.
    #[must_use]
    pub const fn query_param(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::OneHour => "1h",
        }
    }
}

/// Price/volume/holder statistics for a target token over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStat {
    /// The target token this statistic describes.
    pub token: Address,
    /// The window this statistic was fetched for.
    pub window: Window,
    /// Percentage price change over the window (can be negative).
    pub price_change_pct: f64,
    /// Trading volume in USD over the window.
    pub volume_usd: f64,
    /// Number of transactions observed in the window.
    pub tx_count: u64,
    /// Top-10 holder concentration, as a percentage (0-100).
    pub top10_pct: f64,
    /// When this statistic was fetched.
    pub updated_at: DateTime<Utc>,
    /// Completeness of the underlying data.
    pub completeness: PriceCompleteness,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CUMULATIVE WINDOW
// ═══════════════════════════════════════════════════════════════════════════════

/// Rolling window of sub-threshold USD values for a single token, used by
/// Layer-1's cumulative admission path.
#[derive(Debug, Clone, Default)]
pub struct CumulativeWindow {
    /// Ordered `(timestamp, usd_value)` pairs, oldest first.
    entries: VecDeque<(DateTime<Utc>, f64)>,
    /// Running sum of `entries`' USD values. Kept in sync with `entries` so
    /// `sum_usd` never needs to re-scan.
    sum_usd: f64,
}

impl CumulativeWindow {
    /// An empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict entries older than `now - window`, then push `value` at `now`.
    /// Returns the resulting sum.
    pub fn push_and_evict(
        &mut self,
        now: DateTime<Utc>,
        window: chrono::Duration,
        value: UsdAmount,
    ) -> f64 {
        self.evict(now, window);
        self.entries.push_back((now, value.value()));
        self.sum_usd += value.value();
        self.sum_usd
    }

    /// Evict entries older than `now - window` without inserting anything;
    /// used by readers that only need the current sum.
    pub fn evict(&mut self, now: DateTime<Utc>, window: chrono::Duration) {
        let cutoff = now - window;
        while let Some(&(ts, value)) = self.entries.front() {
            if ts < cutoff {
                self.entries.pop_front();
                self.sum_usd -= value;
            } else {
                break;
            }
        }
        // Guard against float drift pushing the running sum negative.
        if self.sum_usd < 0.0 {
            self.sum_usd = 0.0;
        }
    }

    /// Current rolling sum (after the caller has evicted, if it wants an
    /// up-to-date read without also inserting).
    #[must_use]
    pub const fn sum_usd(&self) -> f64 {
        self.sum_usd
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no retained entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COOLDOWN / SEEN TX
// ═══════════════════════════════════════════════════════════════════════════════

/// A live per-token cooldown, as read back from the KV store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    /// The token the cooldown applies to.
    pub token: Address,
    /// When the cooldown expires.
    pub expires_at: DateTime<Utc>,
}

/// A deduplication record for `(tx_hash, log_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeenTx {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Log index within the transaction.
    pub log_index: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MONITOR CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// A single Layer-2 rule, combined disjunctively with rules sharing a
/// window: simultaneous rise and fall rules combine disjunctively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer2Rule {
    /// `priceChange.rise% >= threshold`.
    PriceRise {
        /// Minimum percentage rise required.
        threshold_pct: f64,
    },
    /// `priceChange.fall% >= threshold` (fall expressed as a positive magnitude).
    PriceFall {
        /// Minimum percentage fall required.
        threshold_pct: f64,
    },
    /// `volume >= threshold`.
    Volume {
        /// Minimum USD volume required.
        threshold_usd: f64,
    },
    /// `top10_holders <= threshold`.
    HolderConcentration {
        /// Maximum top-10 holder percentage allowed.
        threshold_pct: f64,
    },
}

/// How enabled Layer-2 rules for a window are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTrigger {
    /// Admit if any enabled rule passes.
    Any,
    /// Admit only if all enabled rules pass.
    All,
}

/// A Layer-2 rule set bound to a starting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer2Template {
    /// The window to start evaluation at, before fallback widening.
    pub starting_window: Window,
    /// Rules evaluated against the (possibly widened) statistics.
    pub rules: Vec<Layer2Rule>,
    /// How the rules combine.
    pub trigger: RuleTrigger,
}

/// Snapshot of monitor thresholds and rule templates, loaded from the KV
/// store at startup/refresh and frozen per event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Minimum USD notional for internal (launchpad-routed) swaps.
    pub min_usd_internal: f64,
    /// Minimum USD notional for external (direct DEX) swaps.
    pub min_usd_external: f64,
    /// Minimum cumulative rolling-window USD sum to admit a sub-threshold
    /// token. Required: there is no baked-in default.
    pub cumulative_min_usd: f64,
    /// Length of the cumulative rolling window.
    pub cumulative_window_secs: u64,
    /// Layer-2 rule template.
    pub layer2_rules: Layer2Template,
    /// Base cooldown duration, before jitter.
    pub cooldown_seconds: u64,
    /// Upper bound of the uniform jitter added to the cooldown.
    pub jitter_seconds: u64,
}

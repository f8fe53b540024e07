//! Decoded on-chain events.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Whether a swap was routed through the Fourmeme launchpad (`Internal`) or
/// directly through a DEX pair (`External`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOrigin {
    /// Routed through the Fourmeme router/proxy contracts.
    Internal,
    /// Routed directly through a Pancake V2 pair.
    External,
}

impl EventOrigin {
    /// Metric label for this origin, used by the `{internal|external}`
    /// counter label sets.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

/// A decoded swap (or Fourmeme trade) event, immutable once produced by the
/// wire decoder.
///
/// Invariant: exactly one side of `(in, out)` is nonzero for the token that
/// ends up identified as the target token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    /// Transaction hash the event was emitted in.
    pub tx_hash: B256,
    /// Log index within the transaction.
    pub log_index: u64,
    /// The pair (or Fourmeme proxy) contract address that emitted the log.
    pub pair: Address,
    /// `token0` of the pair, per the pair's own storage layout.
    pub token0: Address,
    /// `token1` of the pair.
    pub token1: Address,
    /// Amount of `token0` flowing in.
    pub amount0_in: U256,
    /// Amount of `token0` flowing out.
    pub amount0_out: U256,
    /// Amount of `token1` flowing in.
    pub amount1_in: U256,
    /// Amount of `token1` flowing out.
    pub amount1_out: U256,
    /// Block the event was included in.
    pub block_number: u64,
    /// Block timestamp (seconds since epoch), when known at decode time.
    pub timestamp: Option<i64>,
    /// Whether this event came through the launchpad router or a raw pair.
    pub origin: EventOrigin,
}

impl SwapEvent {
    /// The key used for deduplication: `(tx_hash, log_index)`.
    #[must_use]
    pub const fn dedup_key(&self) -> (B256, u64) {
        (self.tx_hash, self.log_index)
    }
}

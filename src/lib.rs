//! BSC Swap Sentinel
//!
//! Watches Pancake V2 and Fourmeme launchpad swap events on BNB Smart Chain
//! and dispatches alerts for swaps that clear a two-layer USD/price/volume
//! filter.
//!
//! # Architecture
//!
//! Hexagonal: the domain layers (filter, resolve, cooldown, dispatch) depend
//! only on the traits in [`ports`]; concrete RPC, cache, and KV adapters live
//! alongside them and are wired together in [`config`] and `main`.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  subscribe ─▶ wire::decode ─▶ resolve ─▶ filter                    │
//! │                                              │                     │
//! │                         cooldown ◀───────────┘                     │
//! │                            │                                       │
//! │                         dispatch ─▶ Notifier                       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`] - Domain types (primitives, events, entities)
//! - [`error`] - Layered error types
//! - [`config`] - Configuration loading and validation
//! - [`abi`] - ABI bindings for the Pancake V2 pair, ERC-20, and Fourmeme contracts
//! - [`wire`] - WebSocket JSON-RPC frame parsing and log decoding
//! - [`rpc`] - JSON-RPC HTTP client (receipts, `eth_call`, block number)
//! - [`cache`] - Hot/warm in-memory caching tiers
//! - [`resolve`] - Pair metadata resolution and launchpad classification
//! - [`filter`] - Two-layer swap admission engine
//! - [`cooldown`] - Per-token cooldown claims and tx-hash dedup
//! - [`dispatch`] - Bounded alert-delivery worker pool and retry queue
//! - [`subscribe`] - WebSocket subscription manager
//! - [`http_apis`] - External HTTP collaborator clients
//! - [`store`] - In-memory persistent key-value store
//! - [`observability`] - Metrics and liveness endpoints
//! - [`pipeline`] - End-to-end event processing, wiring every port together
//! - [`ports`] - Trait boundaries for dependency injection and testing

#![doc(html_root_url = "https://docs.rs/bsc-swap-sentinel")]

pub mod abi;
pub mod cache;
pub mod config;
pub mod cooldown;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod http_apis;
pub mod pipeline;
pub mod ports;
pub mod resolve;
pub mod rpc;
pub mod observability;
pub mod store;
pub mod subscribe;
pub mod types;
pub mod wire;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
        assert!(version().starts_with("0."));
    }
}

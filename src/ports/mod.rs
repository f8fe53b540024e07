//! Port definitions for dependency injection and testability.
//!
//! Ports are trait definitions that describe what the domain layer needs.
//! Following hexagonal architecture, adapters (in the infrastructure layer)
//! implement these traits to provide concrete functionality.
//!
//! # Port Categories
//!
//! | Category | Ports | Purpose |
//! |----------|-------|---------|
//! | Chain RPC | [`ReceiptRpc`] | Receipts, `eth_call`, block number |
//! | External APIs | [`StatsApi`], [`LaunchpadClassifier`], [`SpotPriceApi`] | Off-chain collaborators |
//! | Persistence | [`KvStore`], [`RetryQueueStore`] | Durable key-value state |
//! | Caching | [`Cache`] | In-memory hot/warm tiers |
//! | Dispatch | [`Notifier`] | Alert delivery transport |
//! | Time | [`Clock`] | Testable time operations |
//!
//! # Usage
//!
//! ```ignore
//! use bsc_swap_sentinel::ports::{Clock, KvStore, SystemClock};
//!
//! // Application code depends on traits, not implementations
//! async fn claim_cooldown<K: KvStore, C: Clock>(kv: &K, clock: &C, token: &str) -> Result<bool> {
//!     let _ = clock.now();
//!     kv.set_if_absent(&format!("bsc:cooldown:{token}"), "1", std::time::Duration::from_secs(180))
//!         .await
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod http_apis;
pub mod kv;
pub mod notifier;
pub mod rpc;

pub use cache::{Cache, CacheStats};
pub use clock::{Clock, SystemClock};
pub use http_apis::{LaunchpadClassifier, SpotPriceApi, StatsApi};
pub use kv::KvStore;
pub use notifier::{AlertPayload, Notifier, RetryEntry, RetryQueueStore};
pub use rpc::ReceiptRpc;

#[cfg(any(test, feature = "test-utils"))]
pub use clock::FakeClock;

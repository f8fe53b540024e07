//! Domain types for the swap-alert engine.
//!
//! - [`primitives`] - validated newtypes (`UsdAmount`, `TokenAmount`, `LaunchpadClass`)
//! - [`events`] - decoded on-chain swap/transfer events
//! - [`entities`] - cache/KV-resident domain entities (`PairMeta`, `ReceiptRecord`, ...)

pub mod entities;
pub mod events;
pub mod primitives;

pub use entities::{
    Cooldown, CumulativeWindow, MonitorConfig, PairMeta, PriceCompleteness, PriceStat,
    ReceiptRecord, SeenTx, Window,
};
pub use events::{EventOrigin, SwapEvent};
pub use primitives::{InvalidAmount, LaunchpadClass, TokenAmount, UsdAmount};

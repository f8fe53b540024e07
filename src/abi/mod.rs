//! ABI bindings for the contracts this engine decodes swap activity from.
//!
//! Each contract family has its own submodule with event definitions
//! generated via the `alloy::sol!` macro.
//!
//! # Contract Event Mapping
//!
//! | Contract | Module | Events | Description |
//! |----------|--------|--------|-------------|
//! | PancakeSwap V2 pair | [`pancake_v2`] | 1 | AMM swap, external-origin trades |
//! | ERC20 | [`erc20`] | 1 | Transfer, used for mint/burn and direction hints |
//! | Fourmeme router/proxy | [`fourmeme`] | 3 | Bonding-curve trades, internal-origin |
//!
//! # Usage
//!
//! ```ignore
//! use alloy::sol_types::SolEvent;
//! use bsc_swap_sentinel::abi::pancake_v2::Swap;
//!
//! let event = Swap::decode_log(&log.inner, true)?;
//! ```

pub mod erc20;
pub mod fourmeme;
pub mod pancake_v2;

pub use erc20::Transfer;
pub use fourmeme::{TokenGraduated, TokenPurchase, TokenSale};
pub use pancake_v2::Swap;

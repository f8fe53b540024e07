//! USD normalization for swap amounts.

use alloy::primitives::Address;

use crate::types::entities::PairMeta;
use crate::types::events::SwapEvent;
use crate::types::primitives::{TokenAmount, UsdAmount};

/// WBNB/USD fallback used only if a live spot quote was never obtained.
pub const WBNB_FALLBACK_USD: f64 = 600.0;

/// Normalize a swap's notional value to USD.
///
/// Both sides of a swap move on every event, so the quote side can't be
/// read off which amount is nonzero; it's picked the same way
/// [`crate::resolve::MetadataResolver::target_token`] picks the non-quote
/// side: `token0` is the quote if it's WBNB or a recognized stablecoin,
/// else `token1` is. Stablecoins price at `$1`, WBNB (and anything
/// unrecognized) uses `wbnb_price_usd` (falling back to
/// [`WBNB_FALLBACK_USD`] when `None` — only if no live quote was ever
/// cached).
#[must_use]
pub fn usd_value(event: &SwapEvent, meta: &PairMeta, stablecoins: &[Address], wbnb: Address, wbnb_price_usd: Option<f64>) -> UsdAmount {
    let token0_is_quote = meta.token0 == wbnb || stablecoins.contains(&meta.token0);
    let (quote_token, quote_decimals, quote_amount) = if token0_is_quote {
        (meta.token0, meta.decimals0, event.amount0_in.max(event.amount0_out))
    } else {
        (meta.token1, meta.decimals1, event.amount1_in.max(event.amount1_out))
    };

    let price = if quote_token == wbnb {
        wbnb_price_usd.unwrap_or(WBNB_FALLBACK_USD)
    } else if stablecoins.contains(&quote_token) {
        1.0
    } else {
        wbnb_price_usd.unwrap_or(WBNB_FALLBACK_USD)
    };

    let Ok(amount) = TokenAmount::new(quote_amount, quote_decimals) else {
        return UsdAmount::ZERO;
    };
    amount.to_usd(price).unwrap_or(UsdAmount::ZERO)
}

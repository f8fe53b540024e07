//! Validated primitive types for domain entities.
//!
//! These newtypes provide type safety and validation at construction time,
//! following the same pattern used for on-chain addresses: wrap a raw value,
//! reject malformed input at the boundary, and keep domain logic oblivious to
//! representation details.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// USD AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// A USD-denominated notional value, normalized from on-chain token amounts
/// via a quote price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdAmount(f64);

impl UsdAmount {
    /// Zero USD.
    pub const ZERO: Self = Self(0.0);

    /// Construct from a raw `f64`, rejecting negative or non-finite values.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `value` is negative, NaN, or infinite.
    pub fn new(value: f64) -> Result<Self, InvalidAmount> {
        if !value.is_finite() || value < 0.0 {
            return Err(InvalidAmount::NotAFiniteNonNegative(value));
        }
        Ok(Self(value))
    }

    /// The raw dollar value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Add two USD amounts, saturating at infinity is not possible for
    /// validated inputs so this is a plain sum.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// An invalid amount was supplied (negative, NaN, or infinite).
#[derive(Debug, Error)]
pub enum InvalidAmount {
    /// The value was not representable as a finite, non-negative amount.
    #[error("amount must be finite and non-negative, got {0}")]
    NotAFiniteNonNegative(f64),
    /// Decimals outside the representable ERC-20 range (0..=36).
    #[error("invalid decimals: {0}")]
    InvalidDecimals(u8),
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// A raw on-chain token amount paired with its decimals, convertible to a
/// human-scaled `f64` for USD normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    raw: alloy::primitives::U256,
    decimals: u8,
}

impl TokenAmount {
    /// Construct from a raw on-chain amount and its ERC-20 decimals.
    ///
    /// # Errors
    /// Returns `InvalidAmount::InvalidDecimals` if `decimals > 36` — malformed
    /// decimals outside this range are rejected rather than silently clamped.
    pub fn new(raw: alloy::primitives::U256, decimals: u8) -> Result<Self, InvalidAmount> {
        if decimals > 36 {
            return Err(InvalidAmount::InvalidDecimals(decimals));
        }
        Ok(Self { raw, decimals })
    }

    /// The raw wei-scale amount.
    #[must_use]
    pub const fn raw(&self) -> alloy::primitives::U256 {
        self.raw
    }

    /// The ERC-20 decimals used to scale `raw` into human units.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Convert to a human-scaled `f64`. Precision loss beyond `f64`'s mantissa
    /// is acceptable here: this value only ever feeds USD-threshold
    /// comparisons, never accounting.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        let raw = self.raw.to_string().parse::<f64>().unwrap_or(f64::MAX);
        raw / 10f64.powi(i32::from(self.decimals))
    }

    /// Multiply the human-scaled amount by a quote price to get a USD value.
    ///
    /// # Errors
    /// Propagates `InvalidAmount` if the result is not finite/non-negative.
    pub fn to_usd(&self, quote_price: f64) -> Result<UsdAmount, InvalidAmount> {
        UsdAmount::new(self.to_f64() * quote_price)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LAUNCHPAD CLASSIFICATION (tri-state)
// ═══════════════════════════════════════════════════════════════════════════════

/// Tri-state classification of whether a token was issued through the
/// Fourmeme launchpad. `Unknown` means no classification has been cached yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchpadClass {
    /// Not yet classified.
    Unknown,
    /// Classified as a Fourmeme launchpad token.
    Fourmeme,
    /// Classified as not a Fourmeme launchpad token.
    NotFourmeme,
}

impl LaunchpadClass {
    /// `true` only for a confirmed Fourmeme classification.
    #[must_use]
    pub const fn is_fourmeme(self) -> bool {
        matches!(self, Self::Fourmeme)
    }

    /// `true` if a classification has been recorded either way.
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prop_assert;

    #[test]
    fn usd_amount_rejects_negative() {
        assert!(UsdAmount::new(-1.0).is_err());
    }

    #[test]
    fn usd_amount_rejects_non_finite() {
        assert!(UsdAmount::new(f64::NAN).is_err());
        assert!(UsdAmount::new(f64::INFINITY).is_err());
    }

    #[test]
    fn usd_amount_display() {
        let amount = UsdAmount::new(600.5).unwrap();
        assert_eq!(amount.to_string(), "$600.50");
    }

    #[test]
    fn token_amount_rejects_excessive_decimals() {
        assert!(TokenAmount::new(alloy::primitives::U256::from(1u64), 37).is_err());
        assert!(TokenAmount::new(alloy::primitives::U256::from(1u64), 36).is_ok());
    }

    #[test]
    fn token_amount_to_usd() {
        // 0.6 WBNB (18 decimals) at $1000/WBNB => $600
        let raw = alloy::primitives::U256::from(600_000_000_000_000_000u128);
        let amount = TokenAmount::new(raw, 18).unwrap();
        let usd = amount.to_usd(1000.0).unwrap();
        assert!((usd.value() - 600.0).abs() < 1e-6);
    }

    #[test]
    fn launchpad_class_unknown_not_known() {
        assert!(!LaunchpadClass::Unknown.is_known());
        assert!(LaunchpadClass::Fourmeme.is_known());
        assert!(LaunchpadClass::Fourmeme.is_fourmeme());
        assert!(!LaunchpadClass::NotFourmeme.is_fourmeme());
    }

    proptest::proptest! {
        #[test]
        fn to_usd_is_never_negative_for_any_valid_amount(
            raw in 0u128..u128::MAX,
            decimals in 0u8..=36,
            price in 0.0f64..1_000_000.0,
        ) {
            let amount = TokenAmount::new(alloy::primitives::U256::from(raw), decimals).unwrap();
            if let Ok(usd) = amount.to_usd(price) {
                prop_assert!(usd.value() >= 0.0);
                prop_assert!(usd.value().is_finite());
            }
        }
    }
}

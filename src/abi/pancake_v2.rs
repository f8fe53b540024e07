//! ABI bindings for PancakeSwap V2-style pair contracts.
//!
//! `Swap` is the canonical AMM exchange event: exactly one of
//! `(amount0In, amount0Out)` and one of `(amount1In, amount1Out)` is nonzero
//! per side, identifying which token left the pool and which entered it.
//!
//! # Solidity Contract
//!
//! ```solidity
//! interface IPancakePair {
//!     event Swap(
//!         address indexed sender,
//!         uint256 amount0In,
//!         uint256 amount1In,
//!         uint256 amount0Out,
//!         uint256 amount1Out,
//!         address indexed to
//!     );
//! }
//! ```

use alloy::sol;

sol! {
    /// Emitted by a V2 pair on every swap through it.
    ///
    /// # Indexed Fields
    /// - `sender`: router/contract that invoked the swap
    /// - `to`: recipient of the output token
    ///
    /// # Data Fields
    /// - `amount0In`/`amount1In`: input amounts (one is zero)
    /// - `amount0Out`/`amount1Out`: output amounts (one is zero)
    #[derive(Debug, PartialEq, Eq)]
    event Swap(
        address indexed sender,
        uint256 amount0In,
        uint256 amount1In,
        uint256 amount0Out,
        uint256 amount1Out,
        address indexed to
    );
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolEvent;

    use super::*;

    #[test]
    fn swap_signature() {
        assert_eq!(
            Swap::SIGNATURE,
            "Swap(address,uint256,uint256,uint256,uint256,address)"
        );
    }
}

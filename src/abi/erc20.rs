//! ABI bindings for the standard ERC20 `Transfer` event.
//!
//! Used both to spot mint/burn activity around a swap and, combined with a
//! `Swap` in the same receipt, to attribute which token moved which
//! direction when a pair's `token0`/`token1` ordering is still unresolved.
//!
//! # Solidity Contract
//!
//! ```solidity
//! interface IERC20 {
//!     event Transfer(address indexed from, address indexed to, uint256 value);
//! }
//! ```

use alloy::sol;

sol! {
    /// Standard ERC20 transfer event. `from` is `0x0` for mints, `to` is a
    /// burn-address sentinel for burns.
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(
        address indexed from,
        address indexed to,
        uint256 value
    );
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolEvent;

    use super::*;

    #[test]
    fn transfer_signature() {
        assert_eq!(Transfer::SIGNATURE, "Transfer(address,address,uint256)");
    }
}

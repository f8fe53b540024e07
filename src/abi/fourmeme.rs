//! ABI bindings for the Fourmeme launchpad's router and token-sale proxy.
//!
//! Fourmeme-issued tokens trade on a bonding curve before graduating to a
//! PancakeSwap V2 pair. `TokenPurchase`/`TokenSale` are emitted by the proxy
//! during bonding-curve trading (pre-graduation, `EventOrigin::Internal`);
//! `TokenGraduated` marks the point where a standard V2 pair takes over and
//! subsequent swaps arrive as `PancakeV2.Swap` instead.
//!
//! # Solidity Contract
//!
//! ```solidity
//! interface IFourmemeRouter {
//!     event TokenPurchase(address indexed token, address indexed buyer, uint256 bnbIn, uint256 tokenOut);
//!     event TokenSale(address indexed token, address indexed seller, uint256 tokenIn, uint256 bnbOut);
//!     event TokenGraduated(address indexed token, address indexed pair);
//! }
//! ```

use alloy::sol;

sol! {
    /// Bonding-curve buy: BNB in, token out.
    #[derive(Debug, PartialEq, Eq)]
    event TokenPurchase(
        address indexed token,
        address indexed buyer,
        uint256 bnbIn,
        uint256 tokenOut
    );

    /// Bonding-curve sell: token in, BNB out.
    #[derive(Debug, PartialEq, Eq)]
    event TokenSale(
        address indexed token,
        address indexed seller,
        uint256 tokenIn,
        uint256 bnbOut
    );

    /// Emitted once when a token's bonding curve fills and liquidity moves
    /// to a newly created PancakeSwap V2 pair.
    #[derive(Debug, PartialEq, Eq)]
    event TokenGraduated(
        address indexed token,
        address indexed pair
    );
}

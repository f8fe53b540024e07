//! External HTTP API ports: statistics, launchpad classifier, and spot
//! price. Treated as collaborators outside this crate's scope, but the
//! client-side contract lives here behind a trait for testability.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::error::Result;
use crate::types::entities::{PriceStat, Window};

/// Port for the token statistics API: `GET /pair/{addr}?interval={window}`.
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// Fetch statistics for `token` over `window`.
    ///
    /// # Errors
    /// Returns `AppError::Infra(InfraError::Transient(_))` on retryable HTTP
    /// failures.
    async fn get_stats(&self, token: Address, window: Window) -> Result<PriceStat>;
}

/// Port for the launchpad classifier API: `GET /launchpad/{token}`.
#[async_trait]
pub trait LaunchpadClassifier: Send + Sync {
    /// `true` if `token` was issued through the Fourmeme launchpad.
    ///
    /// # Errors
    /// Returns `AppError::Infra(InfraError::Transient(_))` on retryable HTTP
    /// failures.
    async fn is_fourmeme(&self, token: Address) -> Result<bool>;
}

/// Port for the spot price API: `GET /spot/tickers?currency_pair=BNB_USDT`.
#[async_trait]
pub trait SpotPriceApi: Send + Sync {
    /// Current WBNB/USDT spot price.
    ///
    /// # Errors
    /// Returns `AppError::Infra(InfraError::Transient(_))` on retryable HTTP
    /// failures.
    async fn wbnb_usd_price(&self) -> Result<f64>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Scripted mocks for the external HTTP API ports.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{Address, LaunchpadClassifier, PriceStat, Result, SpotPriceApi, StatsApi, Window, async_trait};
    use crate::error::{AppError, InfraError};

    /// Scripted `StatsApi` mock, keyed by `(token, window)`.
    #[derive(Debug, Default)]
    pub struct MockStatsApi {
        stats: Mutex<HashMap<(Address, Window), PriceStat>>,
    }

    impl MockStatsApi {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-load a statistic for `(token, window)`.
        pub fn set_stats(&self, token: Address, window: Window, stat: PriceStat) {
            self.stats
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert((token, window), stat);
        }
    }

    #[async_trait]
    impl StatsApi for MockStatsApi {
        async fn get_stats(&self, token: Address, window: Window) -> Result<PriceStat> {
            self.stats
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&(token, window))
                .cloned()
                .ok_or(AppError::Infra(InfraError::NotFound))
        }
    }

    /// Scripted `LaunchpadClassifier` mock.
    #[derive(Debug, Default)]
    pub struct MockLaunchpadClassifier {
        classifications: Mutex<HashMap<Address, bool>>,
    }

    impl MockLaunchpadClassifier {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-load a classification for `token`.
        pub fn set_classification(&self, token: Address, is_fourmeme: bool) {
            self.classifications
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(token, is_fourmeme);
        }
    }

    #[async_trait]
    impl LaunchpadClassifier for MockLaunchpadClassifier {
        async fn is_fourmeme(&self, token: Address) -> Result<bool> {
            Ok(self
                .classifications
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&token)
                .copied()
                .unwrap_or(false))
        }
    }

    /// Scripted `SpotPriceApi` mock.
    #[derive(Debug)]
    pub struct MockSpotPriceApi {
        price: Mutex<Option<f64>>,
    }

    impl Default for MockSpotPriceApi {
        fn default() -> Self {
            Self {
                price: Mutex::new(None),
            }
        }
    }

    impl MockSpotPriceApi {
        /// Create a mock with no price set yet.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Set the price the next `wbnb_usd_price` call returns.
        pub fn set_price(&self, price: f64) {
            *self.price.lock().unwrap_or_else(|e| e.into_inner()) = Some(price);
        }
    }

    #[async_trait]
    impl SpotPriceApi for MockSpotPriceApi {
        async fn wbnb_usd_price(&self) -> Result<f64> {
            self.price
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .ok_or(AppError::Infra(InfraError::NotFound))
        }
    }
}

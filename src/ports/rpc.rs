//! JSON-RPC port.

use alloy::primitives::{Address, B256, Bytes};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::entities::ReceiptRecord;

/// Port for JSON-RPC calls against the chain node.
#[async_trait]
pub trait ReceiptRpc: Send + Sync {
    /// Fetch a transaction receipt. Returns `Ok(None)` when the receipt is
    /// absent (pending transaction) rather than an error — callers map this
    /// to a `NotFound` outcome, which is never retried.
    ///
    /// # Errors
    /// Returns `AppError::Infra(InfraError::Transient(_))` on network/5xx/429
    /// failures that the caller should retry.
    async fn get_receipt(&self, tx_hash: B256) -> Result<Option<ReceiptRecord>>;

    /// `eth_call` against `to` with calldata `data` at the given block tag
    /// (`"latest"` if `None`).
    ///
    /// # Errors
    /// Returns `AppError::Infra(InfraError::Transient(_))` on retryable
    /// failures.
    async fn eth_call(&self, to: Address, data: Bytes, block: Option<&str>) -> Result<Bytes>;

    /// Current chain head block number.
    ///
    /// # Errors
    /// Returns `AppError::Infra(InfraError::Transient(_))` on retryable
    /// failures.
    async fn block_number(&self) -> Result<u64>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! `ReceiptRpc` mock for tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{Address, B256, Bytes, ReceiptRecord, ReceiptRpc, Result, async_trait};
    use crate::error::{AppError, InfraError};

    /// Scripted `ReceiptRpc` mock: receipts and `eth_call` results are
    /// pre-loaded by the test.
    #[derive(Debug, Default)]
    pub struct MockReceiptRpc {
        receipts: Mutex<HashMap<B256, ReceiptRecord>>,
        eth_call_results: Mutex<HashMap<Address, Bytes>>,
        block_number: Mutex<u64>,
    }

    impl MockReceiptRpc {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-load a receipt for `tx_hash`.
        pub fn set_receipt(&self, tx_hash: B256, receipt: ReceiptRecord) {
            self.receipts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(tx_hash, receipt);
        }

        /// Pre-load an `eth_call` result for calls targeting `to`.
        pub fn set_eth_call_result(&self, to: Address, result: Bytes) {
            self.eth_call_results
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(to, result);
        }
    }

    #[async_trait]
    impl ReceiptRpc for MockReceiptRpc {
        async fn get_receipt(&self, tx_hash: B256) -> Result<Option<ReceiptRecord>> {
            Ok(self
                .receipts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&tx_hash)
                .cloned())
        }

        async fn eth_call(&self, to: Address, _data: Bytes, _block: Option<&str>) -> Result<Bytes> {
            self.eth_call_results
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&to)
                .cloned()
                .ok_or_else(|| AppError::Infra(InfraError::NotFound))
        }

        async fn block_number(&self) -> Result<u64> {
            Ok(*self.block_number.lock().unwrap_or_else(|e| e.into_inner()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::mocks::MockReceiptRpc;
    use super::*;

    #[tokio::test]
    async fn get_receipt_returns_none_when_not_preloaded() {
        let rpc = MockReceiptRpc::new();
        assert!(rpc.get_receipt(B256::from([1u8; 32])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_receipt_returns_preloaded_record() {
        let rpc = MockReceiptRpc::new();
        let tx = B256::from([2u8; 32]);
        rpc.set_receipt(
            tx,
            ReceiptRecord {
                tx_hash: tx,
                logs: vec![],
                status: true,
                gas_used: 21_000,
            },
        );
        let receipt = rpc.get_receipt(tx).await.unwrap().unwrap();
        assert!(receipt.status);
    }
}

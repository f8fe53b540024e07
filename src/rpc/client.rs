//! JSON-RPC HTTPS client.
//!
//! Retries `Transient` failures (network errors, 5xx, explicit 429) up to
//! three times with exponential backoff (`100ms * 2^n` plus jitter),
//! honoring `Retry-After` on 429. Never retries `NotFound` — a missing
//! receipt means the transaction is still pending, not that the call
//! failed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, InfraError, Result};
use crate::ports::ReceiptRpc;
use crate::types::entities::ReceiptRecord;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct RpcResponse<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawReceipt {
    status: Option<String>,
    #[serde(rename = "gasUsed")]
    gas_used: String,
    logs: Vec<serde_json::Value>,
}

/// JSON-RPC client speaking directly to the chain node over HTTPS.
///
/// Holds one [`reqwest::Client`] per instance; [`crate::dispatch`] gives each
/// worker its own client to keep connection pools (≥100 sockets) warm
/// without cross-worker contention.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    /// Build a client against `rpc_url` with the default per-call timeout
    /// and a connection pool sized for worker fan-out.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .pool_max_idle_per_host(100)
            .build()
            .map_err(InfraError::Http)?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    #[instrument(skip(self, params), fields(method))]
    async fn call<T: for<'de> Deserialize<'de>>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            let id = self.next_id();
            let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": id });

            let send_result = self.http.post(&self.rpc_url).json(&body).send().await;

            let response = match send_result {
                Ok(resp) => resp,
                Err(e) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    warn!(method, attempt, error = %e, "rpc call failed, retrying");
                    backoff_sleep(attempt, None).await;
                    continue;
                }
                Err(e) => return Err(AppError::Infra(InfraError::Transient(e.to_string()))),
            };

            if response.status().as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                if attempt < MAX_RETRIES {
                    attempt += 1;
                    warn!(method, attempt, "rpc rate-limited (429), retrying");
                    backoff_sleep(attempt, retry_after).await;
                    continue;
                }
                return Err(AppError::Infra(InfraError::Transient("rate limited".into())));
            }

            if response.status().is_server_error() {
                if attempt < MAX_RETRIES {
                    attempt += 1;
                    warn!(method, attempt, status = %response.status(), "rpc 5xx, retrying");
                    backoff_sleep(attempt, None).await;
                    continue;
                }
                return Err(AppError::Infra(InfraError::Transient(format!(
                    "server error: {}",
                    response.status()
                ))));
            }

            let parsed: RpcResponse<T> = response.json().await.map_err(InfraError::Http)?;
            if let Some(error) = parsed.error {
                return Err(AppError::Infra(InfraError::Transient(format!(
                    "rpc error {}: {}",
                    error.code, error.message
                ))));
            }
            return parsed.result.ok_or_else(|| AppError::Infra(InfraError::NotFound));
        }
    }
}

async fn backoff_sleep(attempt: u32, retry_after: Option<Duration>) {
    if let Some(delay) = retry_after {
        tokio::time::sleep(delay).await;
        return;
    }
    let exp = BASE_BACKOFF * 2u32.saturating_pow(attempt - 1);
    let jitter_ms = rand::rng().random_range(0..100);
    tokio::time::sleep(exp + Duration::from_millis(jitter_ms)).await;
}

#[async_trait]
impl ReceiptRpc for JsonRpcClient {
    async fn get_receipt(&self, tx_hash: B256) -> Result<Option<ReceiptRecord>> {
        let result: std::result::Result<Option<RawReceipt>, AppError> =
            self.call("eth_getTransactionReceipt", json!([tx_hash])).await.map(Some).or_else(|e| {
                if matches!(e, AppError::Infra(InfraError::NotFound)) {
                    Ok(None)
                } else {
                    Err(e)
                }
            });

        let Some(raw) = result? else {
            debug!(%tx_hash, "receipt not found (pending)");
            return Ok(None);
        };

        let status = raw.status.as_deref() == Some("0x1");
        let gas_used = u64::from_str_radix(raw.gas_used.trim_start_matches("0x"), 16)
            .map_err(|e| AppError::Decode(format!("invalid gasUsed in receipt: {e}")))?;

        Ok(Some(ReceiptRecord { tx_hash, logs: raw.logs, status, gas_used }))
    }

    async fn eth_call(&self, to: Address, data: Bytes, block: Option<&str>) -> Result<Bytes> {
        let block = block.unwrap_or("latest");
        self.call("eth_call", json!([{ "to": to, "data": data }, block])).await
    }

    async fn block_number(&self) -> Result<u64> {
        let hex: String = self.call("eth_blockNumber", json!([])).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| AppError::Decode(format!("invalid blockNumber: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_default_timeout() {
        let client = JsonRpcClient::new("https://bsc-dataseed.example/").expect("client builds");
        assert_eq!(client.rpc_url, "https://bsc-dataseed.example/");
    }

    #[test]
    fn request_ids_are_monotonic() {
        let client = JsonRpcClient::new("https://bsc-dataseed.example/").expect("client builds");
        let first = client.next_id();
        let second = client.next_id();
        assert!(second > first);
    }
}

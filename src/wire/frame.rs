//! Raw JSON-RPC-over-WebSocket frame shapes.
//!
//! These mirror the wire format directly rather than going through a
//! provider abstraction, since [`crate::subscribe`] drives the socket by
//! hand to get exponential-backoff reconnects and precise control over
//! resubscription.

use alloy::primitives::{Address, B256, Bytes};
use serde::Deserialize;

fn hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    u64::from_str_radix(s, 16).map_err(serde::de::Error::custom)
}

/// The `result` object inside an `eth_subscription` log notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(rename = "blockNumber", deserialize_with = "hex_u64")]
    pub block_number: u64,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: B256,
    #[serde(rename = "logIndex", deserialize_with = "hex_u64")]
    pub log_index: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriptionParams {
    subscription: String,
    result: RawLog,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriptionNotification {
    method: String,
    params: SubscriptionParams,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscribeAck {
    id: u64,
    result: String,
}

/// A parsed inbound WebSocket frame.
#[derive(Debug, Clone)]
pub enum WsFrame {
    /// Response to an `eth_subscribe` request, carrying the assigned
    /// subscription id.
    SubscribeAck { request_id: u64, subscription_id: String },
    /// A log delivered under an active subscription.
    Log { subscription_id: String, log: RawLog },
    /// Well-formed JSON that is neither of the above (e.g. an error
    /// response, a pong, or a subscription kind this engine doesn't use).
    Other,
}

/// Parse a single UTF-8 text frame.
///
/// # Errors
/// Returns `Err` when `text` is not valid JSON.
pub fn parse_frame(text: &str) -> Result<WsFrame, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    if let Ok(notification) = serde_json::from_value::<SubscriptionNotification>(value.clone())
        && notification.method == "eth_subscription"
    {
        return Ok(WsFrame::Log {
            subscription_id: notification.params.subscription,
            log: notification.params.result,
        });
    }

    if let Ok(ack) = serde_json::from_value::<SubscribeAck>(value) {
        return Ok(WsFrame::SubscribeAck {
            request_id: ack.id,
            subscription_id: ack.result,
        });
    }

    Ok(WsFrame::Other)
}

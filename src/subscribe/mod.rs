//! Subscription manager: raw WS JSON-RPC framing, hand-driven (not through a
//! provider abstraction) so reconnects, ping/pong, and resubscription are
//! fully under this engine's control.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{AppError, InfraError, Result};
use crate::wire::frame::{RawLog, WsFrame, parse_frame};

/// Base of the exponential reconnect backoff.
const BACKOFF_BASE: Duration = Duration::from_secs(1);
/// Cap on reconnect backoff.
const BACKOFF_CAP: Duration = Duration::from_secs(60);
/// Application-level ping interval.
const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Time to wait for a pong before treating the connection as dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A set of contract addresses and log topics subscribed to together under
/// one `eth_subscribe` call.
#[derive(Debug, Clone)]
pub struct TopicGroup {
    /// A label for this group, used only for logging/metrics.
    pub label: String,
    /// Contract addresses to filter on.
    pub addresses: Vec<Address>,
    /// Topic0 hashes (event signatures) to filter on.
    pub topics: Vec<B256>,
}

impl TopicGroup {
    fn subscribe_params(&self) -> serde_json::Value {
        json!([
            "logs",
            {
                "address": self.addresses,
                "topics": [self.topics],
            }
        ])
    }
}

/// Exponential backoff with jitter: `1s, factor 2, capped at 60s, with
/// jitter`.
#[must_use]
pub fn reconnect_backoff(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let capped = exp.min(BACKOFF_CAP);
    let jitter_ms = rand::rng().random_range(0..=(capped.as_millis() / 4).max(1) as u64);
    capped + Duration::from_millis(jitter_ms)
}

/// Maps subscription ids (assigned by the node) back to the topic group
/// that was requested, and the in-flight request id → group index while an
/// ack is pending.
#[derive(Debug, Default)]
struct RoutingTable {
    pending: HashMap<u64, usize>,
    active: HashMap<String, usize>,
}

impl RoutingTable {
    fn record_request(&mut self, request_id: u64, group_index: usize) {
        self.pending.insert(request_id, group_index);
    }

    fn record_ack(&mut self, request_id: u64, subscription_id: String) {
        if let Some(group_index) = self.pending.remove(&request_id) {
            self.active.insert(subscription_id, group_index);
        }
    }

    fn group_for(&self, subscription_id: &str) -> Option<usize> {
        self.active.get(subscription_id).copied()
    }

    fn active_count(&self) -> usize {
        self.active.len()
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.active.clear();
    }
}

/// A log delivered by an active subscription, tagged with the topic group
/// it was routed from.
#[derive(Debug, Clone)]
pub struct RoutedLog {
    /// Index into the manager's `topic_groups`.
    pub group_index: usize,
    /// The decoded wire-level log.
    pub log: RawLog,
}

/// Drives one WebSocket connection: subscribes to all configured topic
/// groups, forwards logs to `sender`, and reconnects with backoff on any
/// disconnect, resubscribing to the same topic set every time.
pub struct SubscriptionManager {
    ws_url: String,
    topic_groups: Vec<TopicGroup>,
    sender: mpsc::Sender<RoutedLog>,
    next_request_id: AtomicU64,
    routing: Mutex<RoutingTable>,
}

impl SubscriptionManager {
    /// Build a manager for the given topic groups.
    #[must_use]
    pub fn new(ws_url: impl Into<String>, topic_groups: Vec<TopicGroup>, sender: mpsc::Sender<RoutedLog>) -> Self {
        Self {
            ws_url: ws_url.into(),
            topic_groups,
            sender,
            next_request_id: AtomicU64::new(1),
            routing: Mutex::new(RoutingTable::default()),
        }
    }

    /// Number of subscriptions currently believed active.
    #[must_use]
    pub fn active_subscription_count(&self) -> usize {
        self.routing.lock().unwrap_or_else(|e| e.into_inner()).active_count()
    }

    /// Run until `shutdown` is cancelled, reconnecting (with backoff) on
    /// every disconnect.
    ///
    /// # Errors
    /// Returns an error only if the log channel closes; transport failures
    /// are handled internally via reconnect.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut attempt = 0u32;

        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }

            match self.run_session(&shutdown).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if shutdown.is_cancelled() {
                        return Ok(());
                    }
                    warn!(error = %e, attempt, "websocket session ended, reconnecting");
                    self.routing.lock().unwrap_or_else(|e| e.into_inner()).clear();
                    let delay = reconnect_backoff(attempt);
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        () = shutdown.cancelled() => return Ok(()),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn run_session(&self, shutdown: &CancellationToken) -> Result<()> {
        let (ws, _response) = connect_async(&self.ws_url)
            .await
            .map_err(|e| AppError::Infra(InfraError::WebSocket(e)))?;
        info!(url = %self.ws_url, "websocket connected");

        let (mut write, mut read) = ws.split();
        self.send_subscriptions(&mut write).await?;

        let mut ping_timer = interval(PING_INTERVAL);
        ping_timer.tick().await; // first tick fires immediately; consume it
        let mut pong_deadline: Option<tokio::time::Instant> = None;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => return Ok(()),

                _ = ping_timer.tick(), if pong_deadline.is_none() => {
                    write.send(Message::Ping(Vec::new().into())).await
                        .map_err(|e| AppError::Infra(InfraError::WebSocket(e)))?;
                    pong_deadline = Some(tokio::time::Instant::now() + PONG_TIMEOUT);
                }

                () = tokio::time::sleep_until(pong_deadline.unwrap_or_else(tokio::time::Instant::now)), if pong_deadline.is_some() => {
                    return Err(AppError::Infra(InfraError::Timeout("pong not received".into())));
                }

                maybe_msg = read.next() => {
                    match maybe_msg {
                        Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()).await?,
                        Some(Ok(Message::Pong(_))) => pong_deadline = None,
                        Some(Ok(Message::Ping(_))) => {}
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(AppError::Infra(InfraError::Transient("connection closed".into())));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(AppError::Infra(InfraError::WebSocket(e))),
                    }
                }
            }
        }
    }

    async fn send_subscriptions(&self, write: &mut (impl futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin)) -> Result<()> {
        for (index, group) in self.topic_groups.iter().enumerate() {
            let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
            self.routing.lock().unwrap_or_else(|e| e.into_inner()).record_request(request_id, index);

            let request = json!({
                "id": request_id,
                "method": "eth_subscribe",
                "params": group.subscribe_params(),
            });
            write
                .send(Message::Text(request.to_string().into()))
                .await
                .map_err(|e| AppError::Infra(InfraError::WebSocket(e)))?;
            debug!(group = %group.label, request_id, "sent subscription request");
        }
        Ok(())
    }

    async fn handle_frame(&self, text: &str) -> Result<()> {
        let frame = parse_frame(text).map_err(|e| AppError::Decode(e.to_string()))?;
        match frame {
            WsFrame::SubscribeAck { request_id, subscription_id } => {
                self.routing.lock().unwrap_or_else(|e| e.into_inner()).record_ack(request_id, subscription_id);
            }
            WsFrame::Log { subscription_id, log } => {
                let Some(group_index) = self.routing.lock().unwrap_or_else(|e| e.into_inner()).group_for(&subscription_id) else {
                    warn!(subscription_id, "log for unknown subscription, dropping");
                    return Ok(());
                };
                if self.sender.send(RoutedLog { group_index, log }).await.is_err() {
                    return Err(AppError::Infra(InfraError::Transient("routed-log channel closed".into())));
                }
            }
            WsFrame::Other => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let b0 = reconnect_backoff(0);
        let b1 = reconnect_backoff(1);
        assert!(b0 >= BACKOFF_BASE && b0 < BACKOFF_BASE * 2);
        assert!(b1 >= Duration::from_secs(2) && b1 < Duration::from_secs(4));
        assert!(reconnect_backoff(10) <= BACKOFF_CAP + Duration::from_millis(BACKOFF_CAP.as_millis() as u64 / 4));
    }

    #[test]
    fn routing_table_tracks_request_then_ack() {
        let mut table = RoutingTable::default();
        table.record_request(1, 0);
        assert_eq!(table.active_count(), 0);
        table.record_ack(1, "0xsub1".into());
        assert_eq!(table.active_count(), 1);
        assert_eq!(table.group_for("0xsub1"), Some(0));
    }

    #[test]
    fn routing_table_survives_reconnect_with_same_groups() {
        let mut table = RoutingTable::default();
        table.record_request(1, 0);
        table.record_ack(1, "0xold".into());
        assert_eq!(table.active_count(), 1);

        table.clear();
        assert_eq!(table.active_count(), 0);

        table.record_request(2, 0);
        table.record_ack(2, "0xnew".into());
        assert_eq!(table.group_for("0xnew"), Some(0));
        assert_eq!(table.group_for("0xold"), None);
    }

    #[test]
    fn subscribe_params_shape_matches_wire_contract() {
        let group = TopicGroup {
            label: "pancake".into(),
            addresses: vec![Address::from([1u8; 20])],
            topics: vec![B256::from([2u8; 32])],
        };
        let params = group.subscribe_params();
        assert_eq!(params[0], "logs");
        assert!(params[1]["address"].is_array());
        assert!(params[1]["topics"][0].is_array());
    }
}

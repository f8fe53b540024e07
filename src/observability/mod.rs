//! Observability: counters, gauges, and a histogram exported as Prometheus
//! text at `GET /metrics`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Install the global Prometheus recorder and return a handle for
/// rendering `/metrics` responses.
///
/// # Errors
/// Returns an error if a recorder is already installed (called more than
/// once per process).
pub fn install_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Build the `/metrics` router, serving `handle`'s rendered snapshot.
#[must_use]
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(move || async move { handle.render() }))
        .layer(TraceLayer::new_for_http())
}

/// Tracks the Unix timestamp of the most recently routed message, for the
/// `/healthz` liveness check.
#[derive(Debug, Default)]
pub struct LivenessState {
    last_message_at: AtomicI64,
    ws_connected: std::sync::atomic::AtomicBool,
}

impl LivenessState {
    /// An empty liveness tracker (no message seen yet).
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record that a message was just routed, at `now`.
    pub fn record_message(&self, now: i64) {
        self.last_message_at.store(now, Ordering::Relaxed);
    }

    /// Record the current WS connection state.
    pub fn set_connected(&self, connected: bool) {
        self.ws_connected.store(connected, Ordering::Relaxed);
    }
}

/// Build the `/healthz` router: `200` with connection state and
/// last-message age while the WS link is up, `503` while it is down.
#[must_use]
pub fn healthz_router(state: Arc<LivenessState>) -> Router {
    Router::new()
        .route(
            "/healthz",
            get(move || {
                let state = state.clone();
                async move {
                    let connected = state.ws_connected.load(Ordering::Relaxed);
                    let last_message_age_secs = chrono::Utc::now().timestamp() - state.last_message_at.load(Ordering::Relaxed);
                    let status = if connected { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
                    (status, Json(json!({ "connected": connected, "last_message_age_secs": last_message_age_secs })))
                }
            }),
        )
        .layer(TraceLayer::new_for_http())
}

/// Increment `messages_total`: every frame the subscription manager routes
/// to a known topic group, before any filtering.
pub fn record_message_received() {
    metrics::counter!("messages_total").increment(1);
}

/// Increment `first_layer_pass{internal|external}` for an admitted Layer-1
/// outcome.
pub fn record_layer1_pass(origin_label: &'static str) {
    metrics::counter!("first_layer_pass", "origin" => origin_label).increment(1);
}

/// Increment `second_layer_check{internal|external}`: Layer-2 was actually
/// evaluated (i.e. not skipped for lack of classification).
pub fn record_layer2_check(origin_label: &'static str) {
    metrics::counter!("second_layer_check", "origin" => origin_label).increment(1);
}

/// Increment `second_layer_pass{internal|external}` for an admitted Layer-2
/// outcome.
pub fn record_layer2_pass(origin_label: &'static str) {
    metrics::counter!("second_layer_pass", "origin" => origin_label).increment(1);
}

/// Increment `alerts{success|failure}`.
pub fn record_alert(outcome_label: &'static str) {
    metrics::counter!("alerts", "outcome" => outcome_label).increment(1);
}

/// Increment `cache_hits{receipt|fourmeme}`.
pub fn record_cache_hit(kind_label: &'static str) {
    metrics::counter!("cache_hits", "kind" => kind_label).increment(1);
}

/// Increment `fallback{1m->5m, 5m->1h}` when Layer-2 widens a window.
pub fn record_fallback(transition_label: &'static str) {
    metrics::counter!("fallback", "transition" => transition_label).increment(1);
}

/// Increment `429s` for a rate-limited upstream response.
pub fn record_rate_limited() {
    metrics::counter!("http_429_total").increment(1);
}

/// Increment `receipts_reverted_total`: an otherwise-admitted swap whose
/// transaction receipt reported `status = false`, dropped before dispatch.
pub fn record_receipt_reverted() {
    metrics::counter!("receipts_reverted_total").increment(1);
}

/// Increment `receipts_pending_total`: the receipt was still absent
/// (`NotFound`) when an otherwise-admitted swap tried to confirm it.
pub fn record_receipt_pending() {
    metrics::counter!("receipts_pending_total").increment(1);
}

/// Set the `ws_connections` gauge.
pub fn set_ws_connections(count: f64) {
    metrics::gauge!("ws_connections").set(count);
}

/// Set the `cache_size{kind}` gauge.
pub fn set_cache_size(kind_label: &'static str, size: f64) {
    metrics::gauge!("cache_size", "kind" => kind_label).set(size);
}

/// Record one observation of the `processing_seconds` histogram.
pub fn record_processing_seconds(seconds: f64) {
    metrics::histogram!("processing_seconds").record(seconds);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_helpers_do_not_panic_without_an_installed_recorder() {
        record_message_received();
        record_layer1_pass("internal");
        record_layer2_check("external");
        record_layer2_pass("external");
        record_alert("success");
        record_cache_hit("receipt");
        record_fallback("1m->5m");
        record_rate_limited();
        record_receipt_reverted();
        record_receipt_pending();
        set_ws_connections(1.0);
        set_cache_size("hot_pair_meta", 42.0);
        record_processing_seconds(0.125);
    }

    #[test]
    fn liveness_state_tracks_last_message_and_connection() {
        let state = LivenessState::new();
        assert!(!state.ws_connected.load(Ordering::Relaxed));
        state.set_connected(true);
        state.record_message(100);
        assert!(state.ws_connected.load(Ordering::Relaxed));
        assert_eq!(state.last_message_at.load(Ordering::Relaxed), 100);
    }
}

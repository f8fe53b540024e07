//! HTTP clients for the external collaborator ports: token statistics,
//! launchpad classification, spot price, and alert delivery.
//!
//! Mirrors [`crate::rpc::client::JsonRpcClient`]'s shape — one pooled
//! [`reqwest::Client`] per adapter, `Transient` on retryable failures — but
//! these are plain REST `GET`/`POST` calls rather than JSON-RPC envelopes,
//! so retry is left to [`crate::rpc`]'s pattern only where it matters
//! (callers already retry via [`crate::filter::layer2`]'s window widening
//! for stats, and [`crate::dispatch`] for notification delivery).

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, InfraError, Result};
use crate::ports::http_apis::{LaunchpadClassifier, SpotPriceApi, StatsApi};
use crate::ports::notifier::{AlertPayload, Notifier};
use crate::types::entities::{PriceCompleteness, PriceStat, Window};

fn classify_status(status: reqwest::StatusCode) -> Option<&'static str> {
    if status.as_u16() == 429 {
        Some("rate limited")
    } else if status.is_server_error() {
        Some("server error")
    } else {
        None
    }
}

/// HTTP client for the token statistics API: `GET /pair/{addr}?interval={window}`.
#[derive(Debug)]
pub struct HttpStatsApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStatsApi {
    /// Build a client against `base_url` (e.g. `https://stats.example.com`).
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(InfraError::Http)?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "priceChangePct")]
    price_change_pct: f64,
    #[serde(rename = "volumeUsd")]
    volume_usd: f64,
    #[serde(rename = "txCount")]
    tx_count: u64,
    #[serde(rename = "top10Pct")]
    top10_pct: f64,
    #[serde(default)]
    complete: bool,
}

#[async_trait]
impl StatsApi for HttpStatsApi {
    #[instrument(skip(self), fields(%token))]
    async fn get_stats(&self, token: Address, window: Window) -> Result<PriceStat> {
        let url = format!("{}/pair/{token:#x}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("interval", window.query_param())])
            .send()
            .await
            .map_err(|e| AppError::Infra(InfraError::Transient(e.to_string())))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(PriceStat {
                token,
                window,
                price_change_pct: 0.0,
                volume_usd: 0.0,
                tx_count: 0,
                top10_pct: 0.0,
                updated_at: chrono::Utc::now(),
                completeness: PriceCompleteness::Empty,
            });
        }
        if let Some(reason) = classify_status(response.status()) {
            return Err(AppError::Infra(InfraError::Transient(reason.to_string())));
        }

        let body: StatsResponse = response.json().await.map_err(InfraError::Http)?;
        Ok(PriceStat {
            token,
            window,
            price_change_pct: body.price_change_pct,
            volume_usd: body.volume_usd,
            tx_count: body.tx_count,
            top10_pct: body.top10_pct,
            updated_at: chrono::Utc::now(),
            completeness: if body.complete { PriceCompleteness::Complete } else { PriceCompleteness::Partial },
        })
    }
}

/// HTTP client for the launchpad classifier API: `GET /launchpad/{token}`.
#[derive(Debug)]
pub struct HttpLaunchpadClassifier {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLaunchpadClassifier {
    /// Build a client against `base_url`.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(InfraError::Http)?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    #[serde(rename = "isFourmeme")]
    is_fourmeme: bool,
}

#[async_trait]
impl LaunchpadClassifier for HttpLaunchpadClassifier {
    #[instrument(skip(self), fields(%token))]
    async fn is_fourmeme(&self, token: Address) -> Result<bool> {
        let url = format!("{}/launchpad/{token:#x}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Infra(InfraError::Transient(e.to_string())))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if let Some(reason) = classify_status(response.status()) {
            return Err(AppError::Infra(InfraError::Transient(reason.to_string())));
        }

        let body: ClassifierResponse = response.json().await.map_err(InfraError::Http)?;
        Ok(body.is_fourmeme)
    }
}

/// HTTP client for the spot price API: `GET /spot/tickers?currency_pair=BNB_USDT`.
#[derive(Debug)]
pub struct HttpSpotPriceApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSpotPriceApi {
    /// Build a client against `base_url`.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(InfraError::Http)?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[derive(Debug, Deserialize)]
struct SpotTickerResponse {
    last: String,
}

#[async_trait]
impl SpotPriceApi for HttpSpotPriceApi {
    #[instrument(skip(self))]
    async fn wbnb_usd_price(&self) -> Result<f64> {
        let url = format!("{}/spot/tickers", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("currency_pair", "BNB_USDT")])
            .send()
            .await
            .map_err(|e| AppError::Infra(InfraError::Transient(e.to_string())))?;

        if let Some(reason) = classify_status(response.status()) {
            return Err(AppError::Infra(InfraError::Transient(reason.to_string())));
        }

        let body: SpotTickerResponse = response.json().await.map_err(InfraError::Http)?;
        body.last.parse().map_err(|_| AppError::Decode(format!("invalid spot price: {}", body.last)))
    }
}

/// HTTP client for the alert delivery API (treated as a send-message RPC
/// returning boolean success).
#[derive(Debug)]
pub struct HttpNotifier {
    http: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    /// Build a client against `base_url`.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(InfraError::Http)?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip(self, payload), fields(chat_id = %payload.chat_id))]
    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        let url = format!("{}/send", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Dispatch(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Dispatch(format!("notifier returned {}", response.status())))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    #[tokio::test]
    async fn stats_api_parses_a_complete_response() {
        let server = MockServer::start().await;
        let token = Address::from([1u8; 20]);
        Mock::given(method("GET"))
            .and(path(format!("/pair/{token:#x}")))
            .and(query_param("interval", "1m"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "priceChangePct": 22.5,
                "volumeUsd": 12_345.0,
                "txCount": 7,
                "top10Pct": 14.2,
                "complete": true,
            })))
            .mount(&server)
            .await;

        let client = HttpStatsApi::new(server.uri(), timeout()).unwrap();
        let stat = client.get_stats(token, Window::OneMinute).await.unwrap();
        assert_eq!(stat.price_change_pct, 22.5);
        assert_eq!(stat.completeness, PriceCompleteness::Complete);
    }

    #[tokio::test]
    async fn stats_api_treats_404_as_empty_completeness() {
        let server = MockServer::start().await;
        let token = Address::from([2u8; 20]);
        Mock::given(method("GET"))
            .and(path(format!("/pair/{token:#x}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpStatsApi::new(server.uri(), timeout()).unwrap();
        let stat = client.get_stats(token, Window::FiveMinutes).await.unwrap();
        assert_eq!(stat.completeness, PriceCompleteness::Empty);
    }

    #[tokio::test]
    async fn stats_api_surfaces_5xx_as_transient() {
        let server = MockServer::start().await;
        let token = Address::from([3u8; 20]);
        Mock::given(method("GET"))
            .and(path(format!("/pair/{token:#x}")))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpStatsApi::new(server.uri(), timeout()).unwrap();
        let err = client.get_stats(token, Window::OneMinute).await.unwrap_err();
        assert!(matches!(err, AppError::Infra(InfraError::Transient(_))));
    }

    #[tokio::test]
    async fn launchpad_classifier_reads_boolean_flag() {
        let server = MockServer::start().await;
        let token = Address::from([4u8; 20]);
        Mock::given(method("GET"))
            .and(path(format!("/launchpad/{token:#x}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "isFourmeme": true })))
            .mount(&server)
            .await;

        let client = HttpLaunchpadClassifier::new(server.uri(), timeout()).unwrap();
        assert!(client.is_fourmeme(token).await.unwrap());
    }

    #[tokio::test]
    async fn launchpad_classifier_treats_404_as_not_fourmeme() {
        let server = MockServer::start().await;
        let token = Address::from([5u8; 20]);
        Mock::given(method("GET"))
            .and(path(format!("/launchpad/{token:#x}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpLaunchpadClassifier::new(server.uri(), timeout()).unwrap();
        assert!(!client.is_fourmeme(token).await.unwrap());
    }

    #[tokio::test]
    async fn spot_price_api_parses_the_last_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spot/tickers"))
            .and(query_param("currency_pair", "BNB_USDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "last": "612.34" })))
            .mount(&server)
            .await;

        let client = HttpSpotPriceApi::new(server.uri(), timeout()).unwrap();
        assert!((client.wbnb_usd_price().await.unwrap() - 612.34).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn spot_price_api_rejects_unparseable_last_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spot/tickers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "last": "not-a-number" })))
            .mount(&server)
            .await;

        let client = HttpSpotPriceApi::new(server.uri(), timeout()).unwrap();
        assert!(matches!(client.wbnb_usd_price().await, Err(AppError::Decode(_))));
    }

    #[tokio::test]
    async fn notifier_succeeds_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = HttpNotifier::new(server.uri(), timeout()).unwrap();
        let payload = AlertPayload { chat_id: "c1".into(), text: "alert".into(), buttons: vec![] };
        client.send(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn notifier_errors_on_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpNotifier::new(server.uri(), timeout()).unwrap();
        let payload = AlertPayload { chat_id: "c1".into(), text: "alert".into(), buttons: vec![] };
        assert!(matches!(client.send(&payload).await, Err(AppError::Dispatch(_))));
    }
}

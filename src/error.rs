//! Layered error types for the swap-alert engine.
//!
//! - [`DomainError`] - non-error business outcomes (`FilterReject`, `CooldownHeld`)
//! - [`InfraError`] - infrastructure errors (RPC, WS, HTTP, KV, serialization)
//! - [`AppError`] - application-level errors combining domain and infra
//! - [`ApiError`] - HTTP API errors with status codes (metrics/health surface)
//!
//! # Error Philosophy
//!
//! `FilterReject` and `CooldownHeld` are not failures: they are expected,
//! counted outcomes of normal operation. Everything else follows the usual
//! domain/infra/app layering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Non-error business outcomes, counted but not logged as failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DomainError {
    /// The event was rejected by Layer-1 or Layer-2 filtering.
    #[error("rejected by filter")]
    FilterReject,
    /// A cooldown is already held for this token; the event is deduplicated.
    #[error("cooldown held for token")]
    CooldownHeld,
}

// ═══════════════════════════════════════════════════════════════════════════════
// INFRASTRUCTURE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Infrastructure-level errors from external systems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InfraError {
    /// HTTP client error (RPC, stats/classifier/spot/notifier APIs).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key-value store operation failed.
    #[error("kv store error: {0}")]
    Kv(String),

    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A network/5xx/429 failure that is safe to retry.
    #[error("transient error: {0}")]
    Transient(String),

    /// The requested resource does not exist (e.g. a pending receipt).
    #[error("not found")]
    NotFound,

    /// Operation exceeded its deadline.
    #[error("operation timed out: {0}")]
    Timeout(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// APPLICATION ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Application-level errors, the primary `Result` error type used
/// throughout the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    /// Non-error business outcome (counted, not logged as a failure).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Infrastructure error.
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// A wire frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Pair/token metadata could not be resolved via RPC or HTTP.
    #[error("resolve error: {0}")]
    Resolve(String),

    /// Alert delivery failed after a cooldown was claimed.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Invalid thresholds or configuration at startup; the process exits
    /// non-zero.
    #[error("fatal configuration error: {0}")]
    FatalConfig(String),

    /// Graceful shutdown requested.
    #[error("shutdown requested")]
    ShutdownRequested,
}

/// Type alias for application Results.
pub type Result<T> = std::result::Result<T, AppError>;

// ═══════════════════════════════════════════════════════════════════════════════
// API ERRORS (HTTP-specific)
// ═══════════════════════════════════════════════════════════════════════════════

/// API-level errors with HTTP status codes, for the `/metrics` and
/// `/healthz` surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Wrapped application error.
    #[error(transparent)]
    App(#[from] AppError),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (with source for logging).
    #[error("internal error")]
    Internal(#[source] eyre::Report),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::App(AppError::Domain(_)) | Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string())
            }
            Self::App(AppError::FatalConfig(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string())
            }
            Self::App(
                AppError::Infra(_)
                | AppError::Decode(_)
                | AppError::Resolve(_)
                | AppError::Dispatch(_)
                | AppError::ShutdownRequested,
            )
            | Self::Internal(_) => {
                tracing::error!(error = ?self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error".into(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message
                }
            })),
        )
            .into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVENIENCE CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

impl From<crate::types::primitives::InvalidAmount> for AppError {
    fn from(err: crate::types::primitives::InvalidAmount) -> Self {
        Self::Decode(err.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

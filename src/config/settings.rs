//! Settings structs and loading logic.
//!
//! All settings have sensible defaults and can be overridden via
//! environment variables or configuration files.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// WebSocket subscription endpoint.
    pub ws: WsSettings,
    /// JSON-RPC HTTP endpoint.
    pub rpc: RpcSettings,
    /// External HTTP collaborator endpoints.
    pub external_apis: ExternalApiSettings,
    /// Persistent KV store connection.
    pub kv: KvSettings,
    /// Dispatch worker pool sizing.
    pub dispatch: DispatchSettings,
    /// In-memory cache sizing.
    pub cache: CacheSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Metrics server configuration.
    pub metrics: MetricsSettings,
    /// WBNB/USD spot price fallback policy.
    pub wbnb_price: WbnbPriceSettings,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// Files are loaded in this order (later overrides earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (if exists)
    /// 3. Environment variables with `SENTINEL__` prefix
    ///
    /// # Arguments
    /// * `environment` - Environment name (e.g., "development", "production")
    ///
    /// # Errors
    /// Returns `ConfigError` if configuration is invalid or cannot be loaded.
    pub fn load(environment: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());

        let builder = Config::builder()
            .set_default("ws.url", "wss://bsc-ws-node.nariox.org:443")?
            .set_default("rpc.url", "https://bsc-dataseed.binance.org")?
            .set_default("rpc.timeout_ms", 3_000)?
            .set_default("rpc.max_retries", 3)?
            .set_default("external_apis.stats_base_url", "https://api.example-stats.local")?
            .set_default("external_apis.classifier_base_url", "https://api.example-launchpad.local")?
            .set_default("external_apis.spot_price_base_url", "https://api.example-spot.local")?
            .set_default("external_apis.notifier_base_url", "https://api.example-notifier.local")?
            .set_default("external_apis.timeout_ms", 10_000)?
            .set_default("kv.url", "redis://localhost:6379")?
            .set_default("kv.timeout_ms", 1_000)?
            .set_default("dispatch.worker_count", 20)?
            .set_default("cache.hot_pair_meta_max_capacity", 1_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("logging.file_path", Option::<String>::None)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.host", "0.0.0.0")?
            .set_default("metrics.port", 8001)?
            .set_default("wbnb_price.allow_fallback", false)?
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate settings and return any validation errors.
    ///
    /// # Errors
    /// Returns a list of validation error messages.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.ws.url.is_empty() {
            errors.push("ws.url cannot be empty".into());
        }
        if self.rpc.url.is_empty() {
            errors.push("rpc.url cannot be empty".into());
        }
        if self.rpc.max_retries == 0 {
            errors.push("rpc.max_retries must be non-zero".into());
        }
        if self.kv.url.is_empty() {
            errors.push("kv.url cannot be empty".into());
        }
        if self.dispatch.worker_count == 0 {
            errors.push("dispatch.worker_count must be non-zero".into());
        }
        if self.cache.hot_pair_meta_max_capacity == 0 {
            errors.push("cache.hot_pair_meta_max_capacity must be non-zero".into());
        }
        if self.metrics.port == 0 {
            errors.push("metrics.port must be non-zero".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// WebSocket subscription endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WsSettings {
    /// WebSocket URL for `eth_subscribe`.
    pub url: String,
}

/// JSON-RPC HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcSettings {
    /// HTTP RPC endpoint URL.
    pub url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum retry attempts for transient failures.
    pub max_retries: u32,
}

impl RpcSettings {
    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// External HTTP collaborator endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalApiSettings {
    /// Base URL for the token statistics API.
    pub stats_base_url: String,
    /// Base URL for the launchpad classifier API.
    pub classifier_base_url: String,
    /// Base URL for the spot price API.
    pub spot_price_base_url: String,
    /// Base URL for the notifier API.
    pub notifier_base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ExternalApiSettings {
    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Persistent KV store connection.
#[derive(Debug, Clone, Deserialize)]
pub struct KvSettings {
    /// Connection URL.
    pub url: String,
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: u64,
}

impl KvSettings {
    /// Get the operation timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Dispatch worker pool sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSettings {
    /// Number of concurrent dispatch workers.
    pub worker_count: usize,
}

/// In-memory cache sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Maximum entries retained in the hot pair-meta tier.
    pub hot_pair_meta_max_capacity: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log format (json, pretty).
    pub format: String,
    /// Optional file path for log output.
    pub file_path: Option<String>,
}

/// Metrics server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// Whether the metrics server is enabled.
    pub enabled: bool,
    /// Host to bind the metrics server to.
    pub host: String,
    /// Port for the metrics server.
    pub port: u16,
}

impl MetricsSettings {
    /// Get the metrics socket address string.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// WBNB/USD spot price fallback policy.
#[derive(Debug, Clone, Deserialize)]
pub struct WbnbPriceSettings {
    /// When `false` (the default), startup blocks on the first successful
    /// live spot-price fetch instead of ever pricing WBNB at
    /// [`crate::filter::WBNB_FALLBACK_USD`].
    pub allow_fallback: bool,
}

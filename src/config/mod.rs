//! Configuration loading and validation.
//!
//! Static [`Settings`] (endpoints, timeouts, pool sizing) are loaded from
//! multiple sources in order of precedence:
//! 1. Environment variables (highest, `SENTINEL__` prefix)
//! 2. Environment-specific file (e.g., `config/production.toml`)
//! 3. Default file (`config/default.toml`)
//!
//! Monitor thresholds ([`MonitorConfig`](crate::types::entities::MonitorConfig))
//! are not part of `Settings`: they live in the KV store and are loaded via
//! [`MonitorConfigHandle`] so they can be refreshed without a restart.
//!
//! # Example
//!
//! ```ignore
//! use bsc_swap_sentinel::config::Settings;
//!
//! let settings = Settings::load("production")?;
//! println!("RPC URL: {}", settings.rpc.url);
//! ```

mod monitor;
mod settings;

pub use monitor::{MONITOR_CONFIG_KEY, MonitorConfigHandle, fetch as fetch_monitor_config};
pub use settings::{
    CacheSettings, DispatchSettings, ExternalApiSettings, KvSettings, LoggingSettings,
    MetricsSettings, RpcSettings, Settings, WbnbPriceSettings, WsSettings,
};

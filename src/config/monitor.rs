//! Loading and hot-refresh of [`MonitorConfig`] from the KV store: frozen
//! per event, reloaded at startup and on refresh.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::ports::KvStore;
use crate::types::entities::MonitorConfig;

/// KV key monitor thresholds are published under.
pub const MONITOR_CONFIG_KEY: &str = "bsc:config:monitor";

/// Fetch and parse [`MonitorConfig`] from the KV store.
///
/// # Errors
/// Returns `AppError::FatalConfig` if the key is absent or its value fails
/// to parse; returns the underlying infra error if the KV read itself fails.
#[instrument(skip(kv))]
pub async fn fetch<K: KvStore>(kv: &K) -> Result<MonitorConfig> {
    let raw = kv
        .get(MONITOR_CONFIG_KEY)
        .await?
        .ok_or_else(|| AppError::FatalConfig(format!("{MONITOR_CONFIG_KEY} not set in kv store")))?;
    serde_json::from_str(&raw).map_err(|e| AppError::FatalConfig(format!("invalid monitor config: {e}")))
}

/// A shared, swappable [`MonitorConfig`] snapshot.
///
/// Readers (the filter engine) call [`MonitorConfigHandle::current`] once per
/// event and use that snapshot for the whole event's evaluation, so a
/// concurrent refresh never changes thresholds mid-event.
#[derive(Debug, Clone)]
pub struct MonitorConfigHandle {
    inner: Arc<RwLock<Arc<MonitorConfig>>>,
}

impl MonitorConfigHandle {
    /// Load the initial snapshot from the KV store.
    ///
    /// # Errors
    /// Propagates [`fetch`]'s errors.
    pub async fn load<K: KvStore>(kv: &K) -> Result<Self> {
        let config = fetch(kv).await?;
        Ok(Self { inner: Arc::new(RwLock::new(Arc::new(config))) })
    }

    /// The current, frozen snapshot. Cloning an `Arc` is cheap; callers
    /// should take one snapshot per event rather than re-reading mid-flight.
    #[must_use]
    pub fn current(&self) -> Arc<MonitorConfig> {
        self.inner.read().clone()
    }

    /// Re-fetch from the KV store and swap in the new snapshot.
    ///
    /// # Errors
    /// Propagates [`fetch`]'s errors; on failure the previous snapshot is
    /// left in place.
    #[instrument(skip(self, kv))]
    pub async fn refresh<K: KvStore>(&self, kv: &K) -> Result<()> {
        let config = fetch(kv).await?;
        *self.inner.write() = Arc::new(config);
        info!("monitor config refreshed");
        Ok(())
    }
}

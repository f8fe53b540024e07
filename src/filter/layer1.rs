//! Layer-1 filter: synchronous, RPC-free threshold + cumulative admission.

use chrono::{DateTime, Duration, Utc};

use crate::types::entities::{CumulativeWindow, MonitorConfig};
use crate::types::events::EventOrigin;
use crate::types::primitives::UsdAmount;

/// Outcome of evaluating Layer-1 for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer1Outcome {
    /// Admitted directly: `usd_value` alone cleared the per-origin minimum.
    AdmitDirect,
    /// Admitted via the cumulative rolling window.
    AdmitCumulative,
    /// Rejected; `usd_value` was added to the cumulative window for future
    /// admission.
    Reject,
}

impl Layer1Outcome {
    /// `true` for either admission path.
    #[must_use]
    pub const fn admitted(self) -> bool {
        !matches!(self, Self::Reject)
    }
}

/// Evaluate Layer-1 for `usd_value`, mutating `cumulative` in place.
///
/// Dedup by `(tx_hash, log_index)` happens earlier, in [`crate::cooldown`];
/// by the time an event reaches here it is known-novel.
pub fn evaluate(
    origin: EventOrigin,
    usd_value: UsdAmount,
    config: &MonitorConfig,
    cumulative: &mut CumulativeWindow,
    now: DateTime<Utc>,
) -> Layer1Outcome {
    let min_usd = match origin {
        EventOrigin::Internal => config.min_usd_internal,
        EventOrigin::External => config.min_usd_external,
    };

    if usd_value.value() >= min_usd {
        return Layer1Outcome::AdmitDirect;
    }

    let window = Duration::seconds(i64::try_from(config.cumulative_window_secs).unwrap_or(i64::MAX));
    let sum = cumulative.push_and_evict(now, window, usd_value);

    if sum >= config.cumulative_min_usd {
        Layer1Outcome::AdmitCumulative
    } else {
        Layer1Outcome::Reject
    }
}

//! Production [`RetryQueueStore`] adapter.
//!
//! [`KvStore`](crate::ports::KvStore)'s atomic single-key operations can't
//! express list semantics (append, drain, remove-by-id), so the retry queue
//! and dead-letter sink get their own in-process structure instead of being
//! forced through `KvStore` — cross-restart persistence is out of scope for
//! the same reason [`crate::store::InMemoryKvStore`] is in-process only.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::ports::notifier::{RetryEntry, RetryQueueStore};

/// In-process FIFO retry queue plus a dead-letter sink, drained by a
/// background retry worker loop.
#[derive(Debug, Default)]
pub struct InMemoryRetryQueueStore {
    queue: Mutex<Vec<RetryEntry>>,
    dead_letters: Mutex<Vec<(RetryEntry, String)>>,
}

impl InMemoryRetryQueueStore {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every currently queued entry, leaving the queue
    /// empty. The retry worker calls this once per sweep rather than
    /// popping one at a time so a burst of failures drains in a single pass.
    pub fn drain(&self) -> Vec<RetryEntry> {
        std::mem::take(&mut self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }

    /// Number of entries currently queued for retry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// `true` if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries moved to the dead-letter sink, most recent last.
    #[must_use]
    pub fn dead_lettered(&self) -> Vec<(RetryEntry, String)> {
        self.dead_letters.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl RetryQueueStore for InMemoryRetryQueueStore {
    #[instrument(skip(self, entry), fields(%entry.token, attempt = entry.retry_count))]
    async fn enqueue(&self, entry: RetryEntry) -> Result<()> {
        self.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(entry);
        Ok(())
    }

    #[instrument(skip(self, entry), fields(%entry.token))]
    async fn dead_letter(&self, entry: RetryEntry, reason: &str) -> Result<()> {
        warn!(token = %entry.token, reason, "alert moved to dead-letter sink");
        self.dead_letters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((entry, reason.to_string()));
        Ok(())
    }
}

/// Drain `queue` once and re-attempt every entry via `notifier`, per
/// [`crate::dispatch::retry_once`]'s exhaustion/re-enqueue rule. Intended to
/// run on a periodic interval from `main`.
///
/// # Errors
/// Never returns an error itself; individual entry failures are absorbed
/// (re-enqueued or dead-lettered) rather than propagated, since one bad
/// entry shouldn't stop the sweep.
#[instrument(skip(notifier, queue))]
pub async fn retry_sweep<N: crate::ports::Notifier>(notifier: &N, queue: &InMemoryRetryQueueStore) -> Result<usize> {
    let pending = queue.drain();
    let count = pending.len();
    if count > 0 {
        info!(count, "sweeping retry queue");
    }
    for entry in pending {
        let _ = crate::dispatch::retry_once(notifier, queue, entry).await;
    }
    Ok(count)
}

//! Dispatch: bounded worker pool for alert delivery.
//!
//! Submission blocks when the pool is saturated rather than dropping a
//! frame; each worker releases the caller's cooldown claim on every failure
//! path before returning.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::Semaphore;
use tracing::{error, instrument, warn};

use crate::error::Result;
use crate::ports::{AlertPayload, KvStore, Notifier, RetryEntry, RetryQueueStore};

pub mod retry_queue;

pub use retry_queue::InMemoryRetryQueueStore;

/// Maximum attempts before an entry moves to the dead-letter sink.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Bounded pool of alert-dispatch permits. Each permit stands in for one of
/// the ~20 recommended workers; acquiring one is the backpressure point the
/// WS reader blocks on when the pool is saturated.
#[derive(Debug)]
pub struct DispatchPool {
    permits: Arc<Semaphore>,
}

impl DispatchPool {
    /// Build a pool with `worker_count` concurrent dispatch slots.
    #[must_use]
    pub fn new(worker_count: usize) -> Self {
        Self { permits: Arc::new(Semaphore::new(worker_count.max(1))) }
    }

    /// Dispatch `payload` for `token`, blocking until a worker slot is free.
    ///
    /// On success, releases `token`'s cooldown claim is the CALLER's
    /// responsibility only on the happy path where no alert was sent at
    /// all; once `dispatch` is invoked the cooldown was already claimed and
    /// this function owns releasing it on every failure path.
    #[instrument(skip(self, notifier, retry_queue, kv, payload), fields(%token))]
    pub async fn dispatch<N, R, K>(
        &self,
        notifier: &N,
        retry_queue: &R,
        kv: &K,
        token: Address,
        payload: AlertPayload,
    ) -> Result<()>
    where
        N: Notifier,
        R: RetryQueueStore,
        K: KvStore,
    {
        let _permit = self.permits.acquire().await.expect("semaphore never closed");

        match notifier.send(&payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "notifier delivery failed, enqueueing retry");
                let entry = RetryEntry { token, payload, retry_count: 0 };
                if let Err(enqueue_err) = retry_queue.enqueue(entry).await {
                    error!(error = %enqueue_err, "failed to enqueue retry entry");
                }
                if let Err(release_err) = crate::cooldown::release(kv, token).await {
                    error!(error = %release_err, "failed to release cooldown after dispatch failure");
                }
                Err(e)
            }
        }
    }
}

/// Re-attempt a queued [`RetryEntry`]; on exhaustion, move it to the
/// dead-letter sink instead of re-enqueueing.
///
/// # Errors
/// Propagates the notifier's error if delivery failed and the entry was
/// not yet exhausted (caller re-enqueues with an incremented `retry_count`).
#[instrument(skip(notifier, retry_queue, entry), fields(token = %entry.token, attempt = entry.retry_count))]
pub async fn retry_once<N, R>(notifier: &N, retry_queue: &R, entry: RetryEntry) -> Result<()>
where
    N: Notifier,
    R: RetryQueueStore,
{
    match notifier.send(&entry.payload).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let next_attempt = entry.retry_count + 1;
            if next_attempt >= MAX_RETRY_ATTEMPTS {
                let reason = format!("exhausted {MAX_RETRY_ATTEMPTS} attempts: {e}");
                retry_queue.dead_letter(entry, &reason).await?;
            } else {
                retry_queue
                    .enqueue(RetryEntry { retry_count: next_attempt, ..entry })
                    .await?;
            }
            Err(e)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::kv::mocks::MockKvStore;
    use crate::ports::notifier::mocks::{MockNotifier, MockRetryQueueStore};

    fn payload() -> AlertPayload {
        AlertPayload { chat_id: "c1".into(), text: "alert".into(), buttons: vec![] }
    }

    #[tokio::test]
    async fn successful_dispatch_does_not_touch_retry_queue() {
        let pool = DispatchPool::new(2);
        let notifier = MockNotifier::new();
        let retry_queue = MockRetryQueueStore::new();
        let kv = MockKvStore::new();
        let token = Address::from([1u8; 20]);

        pool.dispatch(&notifier, &retry_queue, &kv, token, payload()).await.unwrap();
        assert_eq!(notifier.count(), 1);
        assert!(retry_queue.queued().is_empty());
    }

    #[tokio::test]
    async fn failed_dispatch_releases_cooldown_and_enqueues_retry() {
        let pool = DispatchPool::new(2);
        let notifier = MockNotifier::new();
        notifier.set_should_fail(true);
        let retry_queue = MockRetryQueueStore::new();
        let kv = MockKvStore::new();
        let token = Address::from([2u8; 20]);

        crate::cooldown::claim(&kv, token, 180, 0).await.unwrap();
        assert!(pool.dispatch(&notifier, &retry_queue, &kv, token, payload()).await.is_err());
        assert_eq!(retry_queue.queued().len(), 1);
        assert!(crate::cooldown::claim(&kv, token, 180, 0).await.unwrap());
    }

    #[tokio::test]
    async fn retry_exhaustion_moves_to_dead_letter() {
        let notifier = MockNotifier::new();
        notifier.set_should_fail(true);
        let retry_queue = MockRetryQueueStore::new();
        let entry = RetryEntry { token: Address::from([3u8; 20]), payload: payload(), retry_count: MAX_RETRY_ATTEMPTS - 1 };

        assert!(retry_once(&notifier, &retry_queue, entry).await.is_err());
        assert_eq!(retry_queue.dead_lettered().len(), 1);
        assert!(retry_queue.queued().is_empty());
    }

    #[tokio::test]
    async fn retry_below_max_re_enqueues_with_incremented_count() {
        let notifier = MockNotifier::new();
        notifier.set_should_fail(true);
        let retry_queue = MockRetryQueueStore::new();
        let entry = RetryEntry { token: Address::from([4u8; 20]), payload: payload(), retry_count: 0 };

        assert!(retry_once(&notifier, &retry_queue, entry).await.is_err());
        let queued = retry_queue.queued();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].retry_count, 1);
    }
}

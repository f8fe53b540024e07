//! Notifier and retry-queue ports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An alert payload ready to dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Destination chat/channel id.
    pub chat_id: String,
    /// Rendered alert text.
    pub text: String,
    /// Button labels/links rendered alongside the alert.
    pub buttons: Vec<String>,
}

/// Port for the notification transport (Telegram/WeChat, treated as a
/// send-message RPC returning boolean success).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `payload`. Returns `Ok(())` on a 2xx response.
    ///
    /// # Errors
    /// Returns `AppError::Dispatch(_)` on network failure or non-2xx.
    async fn send(&self, payload: &AlertPayload) -> Result<()>;
}

/// A retry-queue entry for an alert that failed dispatch after a cooldown
/// was already claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryEntry {
    /// The token the alert concerns (used as the KV key suffix).
    pub token: alloy::primitives::Address,
    /// The payload to redeliver.
    pub payload: AlertPayload,
    /// Number of attempts made so far.
    pub retry_count: u32,
}

/// Port for the persistent (KV-backed) retry queue and dead-letter sink.
#[async_trait]
pub trait RetryQueueStore: Send + Sync {
    /// Enqueue `entry` for retry.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn enqueue(&self, entry: RetryEntry) -> Result<()>;

    /// Move `entry` to the dead-letter sink after exhausting retries.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable.
    async fn dead_letter(&self, entry: RetryEntry, reason: &str) -> Result<()>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    //! Mock `Notifier`/`RetryQueueStore` for tests.

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::{AlertPayload, Notifier, Result, RetryEntry, RetryQueueStore, async_trait};
    use crate::error::AppError;

    /// Mock notifier that counts sends and can be told to fail.
    #[derive(Debug, Default)]
    pub struct MockNotifier {
        send_count: AtomicUsize,
        should_fail: AtomicBool,
    }

    impl MockNotifier {
        /// Create a mock notifier that succeeds by default.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of `send` calls observed.
        #[must_use]
        pub fn count(&self) -> usize {
            self.send_count.load(Ordering::SeqCst)
        }

        /// Make subsequent `send` calls fail.
        pub fn set_should_fail(&self, should_fail: bool) {
            self.should_fail.store(should_fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _payload: &AlertPayload) -> Result<()> {
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(AppError::Dispatch("mock notifier failure".into()));
            }
            self.send_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// In-memory `RetryQueueStore` mock.
    #[derive(Debug, Default)]
    pub struct MockRetryQueueStore {
        queued: Mutex<Vec<RetryEntry>>,
        dead_lettered: Mutex<Vec<(RetryEntry, String)>>,
    }

    impl MockRetryQueueStore {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Entries currently queued for retry.
        #[must_use]
        pub fn queued(&self) -> Vec<RetryEntry> {
            self.queued.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        /// Entries that were moved to the dead-letter sink.
        #[must_use]
        pub fn dead_lettered(&self) -> Vec<(RetryEntry, String)> {
            self.dead_lettered
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    #[async_trait]
    impl RetryQueueStore for MockRetryQueueStore {
        async fn enqueue(&self, entry: RetryEntry) -> Result<()> {
            self.queued.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
            Ok(())
        }

        async fn dead_letter(&self, entry: RetryEntry, reason: &str) -> Result<()> {
            self.dead_lettered
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((entry, reason.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::mocks::{MockNotifier, MockRetryQueueStore};
    use super::*;

    #[tokio::test]
    async fn notifier_counts_successful_sends() {
        let notifier = MockNotifier::new();
        let payload = AlertPayload {
            chat_id: "c1".into(),
            text: "alert".into(),
            buttons: vec![],
        };
        notifier.send(&payload).await.unwrap();
        assert_eq!(notifier.count(), 1);
    }

    #[tokio::test]
    async fn notifier_can_be_made_to_fail() {
        let notifier = MockNotifier::new();
        notifier.set_should_fail(true);
        let payload = AlertPayload {
            chat_id: "c1".into(),
            text: "alert".into(),
            buttons: vec![],
        };
        assert!(notifier.send(&payload).await.is_err());
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn retry_queue_tracks_enqueue_and_dead_letter() {
        let queue = MockRetryQueueStore::new();
        let entry = RetryEntry {
            token: alloy::primitives::Address::ZERO,
            payload: AlertPayload {
                chat_id: "c1".into(),
                text: "alert".into(),
                buttons: vec![],
            },
            retry_count: 0,
        };
        queue.enqueue(entry.clone()).await.unwrap();
        assert_eq!(queue.queued().len(), 1);

        queue.dead_letter(entry, "max attempts exceeded").await.unwrap();
        assert_eq!(queue.dead_lettered().len(), 1);
    }
}

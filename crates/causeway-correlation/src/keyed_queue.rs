//! # Keyed-Queue Correlation Backend
//!
//! The durable, cross-process correlation design: a release pushes its
//! JSON-serialized payload onto a queue keyed by the correlation id; a wait
//! performs a bounded blocking pop on that key.
//!
//! Push-before-pop is the load-bearing property — a release that lands
//! before the wait registers is queued and handed to the eventual waiter,
//! never lost. The bounded pop makes an unanswered wait fail after a fixed
//! interval with a retryable timeout, unlike the in-process backend which
//! parks forever.

use crate::backend::CorrelationBackend;
use async_trait::async_trait;
use causeway_types::{CorrelationError, CorrelationId, Event};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// Fixed bound on one blocking pop.
pub const RELEASE_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// A keyed queue of opaque payloads with a bounded blocking pop.
///
/// Implementations backed by a shared connection must dedicate one connection
/// per blocking pop, so a long poll never starves the connection used for
/// pushes.
#[async_trait]
pub trait KeyedQueue: Send + Sync {
    /// Append `value` to the queue for `key`.
    ///
    /// # Errors
    ///
    /// Backend-specific failures (connection loss, capacity, ...).
    async fn push(&self, key: &str, value: Vec<u8>) -> Result<(), CorrelationError>;

    /// Pop the oldest value for `key`, blocking up to `timeout`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the bound elapsed with the queue still empty.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    async fn pop_blocking(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, CorrelationError>;
}

/// Correlation backend over any [`KeyedQueue`].
pub struct KeyedQueueCorrelation {
    queue: Arc<dyn KeyedQueue>,
    poll_timeout: Duration,
}

impl KeyedQueueCorrelation {
    /// Wrap a keyed queue with the default poll bound.
    #[must_use]
    pub fn new(queue: Arc<dyn KeyedQueue>) -> Self {
        Self {
            queue,
            poll_timeout: RELEASE_POLL_TIMEOUT,
        }
    }

    /// Override the poll bound (tests, latency-sensitive callers).
    #[must_use]
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }
}

#[async_trait]
impl CorrelationBackend for KeyedQueueCorrelation {
    async fn put_and_wait_for_release(&self, key: CorrelationId) -> Result<Event, CorrelationError> {
        let popped = self
            .queue
            .pop_blocking(&key.to_string(), self.poll_timeout)
            .await?;

        let Some(bytes) = popped else {
            return Err(CorrelationError::Timeout {
                key,
                waited_ms: self.poll_timeout.as_millis() as u64,
            });
        };

        debug!(correlation_id = %key, "Popped release payload");
        serde_json::from_slice(&bytes)
            .map_err(|e| CorrelationError::Backend(format!("malformed release payload: {e}")))
    }

    async fn release(&self, key: CorrelationId, payload: Event) -> Result<(), CorrelationError> {
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| CorrelationError::Backend(format!("unserializable release payload: {e}")))?;

        self.queue.push(&key.to_string(), bytes).await?;
        debug!(correlation_id = %key, "Pushed release payload");
        Ok(())
    }
}

/// In-memory [`KeyedQueue`], the bundled reference implementation.
///
/// FIFO per key. Pops are woken by pushes; the notified future is created
/// before the queue check, so a push racing the check cannot be lost.
#[derive(Default)]
pub struct InMemoryKeyedQueue {
    queues: DashMap<String, VecDeque<Vec<u8>>>,
    released: Notify,
}

impl InMemoryKeyedQueue {
    /// Create an empty queue table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently queued under `key`.
    #[must_use]
    pub fn queued_count(&self, key: &str) -> usize {
        self.queues.get(key).map_or(0, |q| q.len())
    }

    fn try_pop(&self, key: &str) -> Option<Vec<u8>> {
        self.queues.get_mut(key).and_then(|mut queue| queue.pop_front())
    }
}

#[async_trait]
impl KeyedQueue for InMemoryKeyedQueue {
    async fn push(&self, key: &str, value: Vec<u8>) -> Result<(), CorrelationError> {
        self.queues.entry(key.to_string()).or_default().push_back(value);
        self.released.notify_waiters();
        Ok(())
    }

    async fn pop_blocking(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, CorrelationError> {
        let deadline = Instant::now() + timeout;
        loop {
            let released = self.released.notified();
            if let Some(value) = self.try_pop(key) {
                return Ok(Some(value));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            if tokio::time::timeout(deadline - now, released).await.is_err() {
                return Ok(None);
            }
        }
    }
}

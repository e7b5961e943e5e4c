//! # In-Process Correlation Backend
//!
//! A table of single-shot tickets for single-process deployments. A wait
//! parks indefinitely — no timeout — and a release resolves at most once
//! because the ticket is removed from the table before the send.
//!
//! A release with no pending waiter is contractually undefined: this
//! implementation logs a warning and reports `NoPendingWaiter`, but callers
//! must not rely on that — the keyed-queue backend queues such releases
//! instead.

use crate::backend::CorrelationBackend;
use async_trait::async_trait;
use causeway_types::{CorrelationError, CorrelationId, Event};
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Single-process park/resolve table.
#[derive(Default)]
pub struct InProcessCorrelation {
    tickets: DashMap<CorrelationId, oneshot::Sender<Event>>,
}

impl InProcessCorrelation {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently parked waiters.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.tickets.len()
    }
}

#[async_trait]
impl CorrelationBackend for InProcessCorrelation {
    async fn put_and_wait_for_release(&self, key: CorrelationId) -> Result<Event, CorrelationError> {
        let (tx, rx) = oneshot::channel();
        // One outstanding waiter per id; a second wait replaces the first,
        // whose ticket is dropped.
        if self.tickets.insert(key, tx).is_some() {
            warn!(correlation_id = %key, "Replaced an existing waiter for this id");
        }
        debug!(correlation_id = %key, "Parked waiting for release");

        rx.await.map_err(|_| CorrelationError::TicketDropped(key))
    }

    async fn release(&self, key: CorrelationId, payload: Event) -> Result<(), CorrelationError> {
        let Some((_, ticket)) = self.tickets.remove(&key) else {
            warn!(correlation_id = %key, "Release with no pending waiter");
            return Err(CorrelationError::NoPendingWaiter(key));
        };

        if ticket.send(payload).is_err() {
            warn!(correlation_id = %key, "Waiter went away before release");
            return Err(CorrelationError::TicketDropped(key));
        }

        debug!(correlation_id = %key, "Released pending waiter");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_types::{EventComposer, PrecedingContext, SourceInfo};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn reply_event(name: &str) -> Event {
        EventComposer::new(SourceInfo::new("correlation-tests", "0.1.0"))
            .compose(name, None, &PrecedingContext::group("NO_ID"))
            .expect("compose")
    }

    #[tokio::test]
    async fn test_wait_resolves_to_released_payload() {
        let backend = Arc::new(InProcessCorrelation::new());
        let key = CorrelationId::new();

        let waiter = {
            let backend = backend.clone();
            tokio::spawn(async move { backend.put_and_wait_for_release(key).await })
        };

        // Give the waiter a chance to park.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(backend.pending_count(), 1);

        backend.release(key, reply_event("DO_SOMETHING_REPLIED")).await.unwrap();

        let released = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("join")
            .expect("task")
            .expect("release");
        assert_eq!(released.name(), "DO_SOMETHING_REPLIED");
        assert_eq!(backend.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unreleased_wait_parks_indefinitely() {
        let backend = InProcessCorrelation::new();
        let key = CorrelationId::new();

        // No timeout on this backend: the wait outlives any bound we pick.
        let hung = timeout(Duration::from_millis(50), backend.put_and_wait_for_release(key)).await;
        assert!(hung.is_err(), "in-process wait must not resolve on its own");
    }

    #[tokio::test]
    async fn test_release_without_waiter_is_an_error() {
        let backend = InProcessCorrelation::new();
        let key = CorrelationId::new();

        let err = backend.release(key, reply_event("DO_SOMETHING_REPLIED")).await.unwrap_err();
        assert!(matches!(err, CorrelationError::NoPendingWaiter(k) if k == key));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_release_resolves_at_most_once() {
        let backend = Arc::new(InProcessCorrelation::new());
        let key = CorrelationId::new();

        let waiter = {
            let backend = backend.clone();
            tokio::spawn(async move { backend.put_and_wait_for_release(key).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        backend.release(key, reply_event("FIRST_REPLY")).await.unwrap();
        // The ticket is gone: a second release cannot reach the same waiter.
        let err = backend.release(key, reply_event("SECOND_REPLY")).await.unwrap_err();
        assert!(matches!(err, CorrelationError::NoPendingWaiter(_)));

        let released = waiter.await.unwrap().unwrap();
        assert_eq!(released.name(), "FIRST_REPLY");
    }
}

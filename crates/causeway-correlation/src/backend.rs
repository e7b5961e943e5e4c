//! Backend capability set for the correlation primitive.

use async_trait::async_trait;
use causeway_types::{CorrelationError, CorrelationId, Event};

/// A pluggable park/release backend keyed by correlation id.
///
/// Contract:
/// - Each id is single-writer (one request parks) / single-reader (one
///   release resolves); a backend must resolve a given id at most once.
/// - Whether a release that precedes the wait survives is backend-defined:
///   the keyed-queue design queues it, the in-process table does not.
/// - The wait's timeout is backend-defined; callers treat a timeout as
///   retryable, distinct from a handler bug.
#[async_trait]
pub trait CorrelationBackend: Send + Sync {
    /// Park until `key` is released, yielding the release payload.
    ///
    /// # Errors
    ///
    /// - [`CorrelationError::Timeout`] when the backend bounds the wait and
    ///   the bound elapses.
    /// - [`CorrelationError::TicketDropped`] / [`CorrelationError::Backend`]
    ///   on backend-specific failures.
    async fn put_and_wait_for_release(&self, key: CorrelationId) -> Result<Event, CorrelationError>;

    /// Release the waiter parked on `key` with `payload`.
    ///
    /// # Errors
    ///
    /// Backend-defined when no waiter is parked on `key`.
    async fn release(&self, key: CorrelationId, payload: Event) -> Result<(), CorrelationError>;
}

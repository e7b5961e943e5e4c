//! Correlation store facade over a pluggable backend.

use causeway_correlation::CorrelationBackend;
use causeway_types::{CorrelationError, CorrelationId, Event};
use std::sync::Arc;

/// Park/release primitive handed to every context.
///
/// Cheap to clone; all clones share the backend.
#[derive(Clone)]
pub struct CorrelationStore {
    backend: Arc<dyn CorrelationBackend>,
}

impl CorrelationStore {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CorrelationBackend>) -> Self {
        Self { backend }
    }

    /// Park until `corr_id` is released, yielding the reply event.
    ///
    /// # Errors
    ///
    /// Backend-defined; a bounded backend surfaces a retryable
    /// [`CorrelationError::Timeout`].
    pub async fn wait_for_response(&self, corr_id: CorrelationId) -> Result<Event, CorrelationError> {
        self.backend.put_and_wait_for_release(corr_id).await
    }

    /// Release whoever is parked on `corr_id` with `reply`.
    ///
    /// # Errors
    ///
    /// Backend-defined when nothing is parked on `corr_id`.
    pub async fn respond(&self, corr_id: CorrelationId, reply: Event) -> Result<(), CorrelationError> {
        self.backend.release(corr_id, reply).await
    }
}

//! # Context Factory
//!
//! Builds events via the composer, publishes them, and wraps them into
//! contexts carrying the emission capability. Any failure on the build path
//! is re-signaled as a single `ContextParsingError` kind so the dispatcher
//! can tell bad input apart from a crashed handler.

use crate::context::EventContext;
use crate::store::CorrelationStore;
use causeway_bus::EventTransport;
use causeway_types::{
    Delivery, DeliveryOrigin, Event, EventComposer, EventPayload, FabricError, PrecedingContext,
};
use std::sync::Arc;
use tracing::debug;

/// Builds, publishes, and wraps events into [`EventContext`]s.
///
/// Cheap to clone; all clones share the composer, transport, and store.
#[derive(Clone)]
pub struct ContextFactory {
    composer: Arc<EventComposer>,
    transport: Arc<dyn EventTransport>,
    store: CorrelationStore,
}

impl ContextFactory {
    /// Wire a factory to its collaborators.
    #[must_use]
    pub fn new(
        composer: EventComposer,
        transport: Arc<dyn EventTransport>,
        store: CorrelationStore,
    ) -> Self {
        Self {
            composer: Arc::new(composer),
            transport,
            store,
        }
    }

    /// The correlation store handed to produced contexts.
    #[must_use]
    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    /// Compose a new event, publish it (fire-and-forget fan-out), and wrap
    /// it into a context.
    ///
    /// # Errors
    ///
    /// Every failure — validation, identity derivation, publish — is wrapped
    /// as [`FabricError::ContextParsing`] carrying the cause.
    pub async fn create(
        &self,
        name: &str,
        payload: Option<EventPayload>,
        preceding: &PrecedingContext,
    ) -> Result<EventContext, FabricError> {
        self.try_create(name, payload, preceding)
            .await
            .map_err(|e| FabricError::ContextParsing { source: Box::new(e) })
    }

    async fn try_create(
        &self,
        name: &str,
        payload: Option<EventPayload>,
        preceding: &PrecedingContext,
    ) -> Result<EventContext, FabricError> {
        let event = self.composer.compose(name, payload, preceding)?;
        debug!(event = %event.name(), id = %event.id(), "Composed event");

        self.transport.publish(event.name(), event.clone()).await?;
        Ok(self.from_event(event))
    }

    /// Wrap an already-received, already-canonical event without re-deriving
    /// identity or re-publishing.
    #[must_use]
    pub fn from_event(&self, event: Event) -> EventContext {
        EventContext::new(event, self.clone())
    }

    /// Wrap a transport delivery. A chained delivery keeps its shared
    /// response slot so the dispatching caller observes the handler's
    /// response.
    #[must_use]
    pub fn from_delivery(&self, delivery: Delivery) -> EventContext {
        let (event, origin) = delivery.into_parts();
        match origin {
            DeliveryOrigin::Transport => self.from_event(event),
            DeliveryOrigin::Chained { response } => {
                EventContext::with_response(event, self.clone(), response)
            }
        }
    }
}

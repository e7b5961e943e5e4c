//! # Causal Context
//!
//! Pairs one handled event with the capability to emit causal descendants.
//! The data side is the plain immutable event record; the capability side is
//! the factory handle (composer + transport + correlation store). The
//! `RESPONSE` scratch slot is shared with whoever dispatched the context
//! synchronously.

use crate::factory::ContextFactory;
use causeway_types::{
    CorrelationId, Event, EventPayload, FabricError, PrecedingContext, ResponseSlot,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A handled event plus the capability to emit descendants.
///
/// Cheap to clone; clones share the event and the response slot.
#[derive(Clone)]
pub struct EventContext {
    event: Arc<Event>,
    response: ResponseSlot,
    factory: ContextFactory,
}

impl EventContext {
    pub(crate) fn new(event: Event, factory: ContextFactory) -> Self {
        Self::with_response(event, factory, ResponseSlot::new())
    }

    pub(crate) fn with_response(event: Event, factory: ContextFactory, response: ResponseSlot) -> Self {
        Self {
            event: Arc::new(event),
            response,
            factory,
        }
    }

    /// The handled event.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Correlation id of the handled event, if it carries one.
    #[must_use]
    pub fn corr_id(&self) -> Option<CorrelationId> {
        self.event.corr_id()
    }

    /// The mutable response scratch slot.
    #[must_use]
    pub fn response(&self) -> &ResponseSlot {
        &self.response
    }

    /// Store an arbitrary response value for a synchronous caller.
    pub fn set_response(&self, value: Value) {
        self.response.set(value);
    }

    /// Store an HTTP-ish `{statusCode, body}` response.
    pub fn respond(&self, status_code: u16, body: Value) {
        self.response.respond(status_code, body);
    }

    /// Emit a fire-and-forget causal descendant.
    ///
    /// The descendant's preceding context is `scope_override` merged over
    /// this event's causal fields; the override wins on conflict.
    ///
    /// # Errors
    ///
    /// [`FabricError::ContextParsing`] when the descendant cannot be built
    /// or published.
    pub async fn emit_event(
        &self,
        name: &str,
        payload: Option<EventPayload>,
        scope_override: Option<PrecedingContext>,
    ) -> Result<EventContext, FabricError> {
        let preceding = scope_override
            .unwrap_or_default()
            .merged_over(&self.event.as_preceding());
        self.factory.create(name, payload, &preceding).await
    }

    /// Emit a request descendant and park until a matching reply releases it.
    ///
    /// A fresh correlation id is minted; the wait is registered on the
    /// correlation store concurrently with the publish (and polled first, so
    /// an in-process release can never beat the registration). No timeout at
    /// this layer — the backend may impose one.
    ///
    /// # Errors
    ///
    /// - [`FabricError::ContextParsing`] when the request event cannot be
    ///   built or published.
    /// - [`FabricError::Correlation`] when the backend bounds the wait and
    ///   the bound elapses — retryable.
    pub async fn emit_request(
        &self,
        name: &str,
        payload: Option<EventPayload>,
    ) -> Result<Event, FabricError> {
        let corr_id = CorrelationId::new();
        let preceding = PrecedingContext::default()
            .with_corr_id(corr_id)
            .merged_over(&self.event.as_preceding());
        debug!(event = name, correlation_id = %corr_id, "Emitting request");

        let store = self.factory.store();
        let (reply, _request_ctx) = tokio::try_join!(
            async { store.wait_for_response(corr_id).await.map_err(FabricError::from) },
            self.factory.create(name, payload, &preceding),
        )?;

        debug!(event = name, correlation_id = %corr_id, reply = %reply.name(), "Request released");
        Ok(reply)
    }
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("event", &self.event.name())
            .field("id", &self.event.id())
            .field("corr_id", &self.event.corr_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CorrelationStore;
    use causeway_bus::{EventTransport, InMemoryEventBus};
    use causeway_correlation::{InMemoryKeyedQueue, InProcessCorrelation, KeyedQueueCorrelation};
    use causeway_types::{EventComposer, SourceInfo};
    use serde_json::json;
    use std::time::Duration;

    fn factory() -> ContextFactory {
        ContextFactory::new(
            EventComposer::new(SourceInfo::new("context-tests", "0.1.0")),
            Arc::new(InMemoryEventBus::new()),
            CorrelationStore::new(Arc::new(InProcessCorrelation::new())),
        )
    }

    async fn root_context(factory: &ContextFactory) -> EventContext {
        factory
            .create("SOMETHING_HAPPENED", None, &PrecedingContext::group("NO_ID"))
            .await
            .expect("root context")
    }

    #[tokio::test]
    async fn test_emit_event_extends_the_chain() {
        let factory = factory();
        let root = root_context(&factory).await;

        let child = root.emit_event("REACT", Some(json!({"k": "v"}).into()), None).await.unwrap();

        assert_eq!(child.event().name(), "REACT");
        assert!(!child.event().is_trigger());
        assert_eq!(child.event().initial_event_id(), root.event().id());
        assert_eq!(child.event().payload(), Some(&json!({"k": "v"})));
    }

    #[tokio::test]
    async fn test_emit_event_override_wins_on_conflict() {
        let factory = factory();
        let root = root_context(&factory).await;
        let corr = CorrelationId::new();

        let child = root
            .emit_event("REACT", None, Some(PrecedingContext::default().with_corr_id(corr)))
            .await
            .unwrap();

        assert_eq!(child.event().corr_id(), Some(corr));
        // Unset override fields fall through to the current causal fields.
        assert_eq!(child.event().group_id(), Some("NO_ID"));
    }

    #[tokio::test]
    async fn test_emit_request_resolves_to_released_reply() {
        let backend = Arc::new(InProcessCorrelation::new());
        let store = CorrelationStore::new(backend);
        let bus: Arc<InMemoryEventBus> = Arc::new(InMemoryEventBus::new());
        let factory = ContextFactory::new(
            EventComposer::new(SourceInfo::new("context-tests", "0.1.0")),
            bus.clone(),
            store.clone(),
        );

        // Release the request as soon as it shows up on the bus.
        {
            let store = store.clone();
            let factory = factory.clone();
            bus.subscribe(
                "DO_SOMETHING_REQUESTED",
                Arc::new(move |delivery| {
                    let store = store.clone();
                    let factory = factory.clone();
                    Box::pin(async move {
                        let request = factory.from_delivery(delivery);
                        let corr_id = request.corr_id().expect("request carries corr id");
                        let reply = request
                            .emit_event("DO_SOMETHING_REPLIED", Some(json!({"hello": "world"}).into()), None)
                            .await?;
                        store.respond(corr_id, reply.event().clone()).await?;
                        Ok(())
                    })
                }),
            );
        }

        let root = root_context(&factory).await;
        let reply = root.emit_request("DO_SOMETHING_REQUESTED", None).await.unwrap();

        assert_eq!(reply.name(), "DO_SOMETHING_REPLIED");
        assert_eq!(reply.payload().unwrap()["hello"], "world");
        // The reply stays in the request's chain and keeps its corr id.
        assert_eq!(reply.initial_event_id(), root.event().id());
        assert!(reply.corr_id().is_some());
    }

    #[tokio::test]
    async fn test_emit_request_timeout_surfaces_as_retryable() {
        let backend = KeyedQueueCorrelation::new(Arc::new(InMemoryKeyedQueue::new()))
            .with_poll_timeout(Duration::from_millis(50));
        let factory = ContextFactory::new(
            EventComposer::new(SourceInfo::new("context-tests", "0.1.0")),
            Arc::new(InMemoryEventBus::new()),
            CorrelationStore::new(Arc::new(backend)),
        );

        let root = root_context(&factory).await;
        let err = root.emit_request("DO_SOMETHING_REQUESTED", None).await.unwrap_err();

        match err {
            FabricError::Correlation(inner) => assert!(inner.is_retryable()),
            other => panic!("expected a correlation timeout, got {other:?}"),
        }
    }
}

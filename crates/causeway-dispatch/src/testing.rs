//! Test helpers for exercising handlers without a wired fabric.
//!
//! [`mock_context`] builds a real [`EventContext`] over a transport that
//! drops everything and an in-process correlation table, so a handler under
//! test can emit descendants and requests without observable side effects.

use crate::context::EventContext;
use crate::factory::ContextFactory;
use crate::store::CorrelationStore;
use async_trait::async_trait;
use causeway_bus::{DeliveryHandler, EventTransport};
use causeway_correlation::InProcessCorrelation;
use causeway_types::{
    Delivery, Event, EventComposer, EventPayload, FabricError, PrecedingContext, SourceInfo,
    TransportError,
};
use std::sync::Arc;

/// A transport that accepts everything and delivers nothing.
#[derive(Debug, Default)]
pub struct NoopTransport;

#[async_trait]
impl EventTransport for NoopTransport {
    async fn publish(&self, _name: &str, _event: Event) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn subscribe(&self, _name: &str, _handler: DeliveryHandler) {}

    async fn dispatch_context(&self, _delivery: Delivery) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A factory wired to a no-op transport and an in-process correlation table.
#[must_use]
pub fn mock_factory() -> ContextFactory {
    ContextFactory::new(
        EventComposer::new(SourceInfo::new("mock", "0.0.0")),
        Arc::new(NoopTransport),
        CorrelationStore::new(Arc::new(InProcessCorrelation::new())),
    )
}

/// Build a context for `name` scoped to a mock group, ready to hand to a
/// handler under test.
///
/// # Errors
///
/// [`FabricError::ContextParsing`] when the event cannot be composed.
pub async fn mock_context(
    name: &str,
    payload: Option<EventPayload>,
) -> Result<EventContext, FabricError> {
    mock_context_in(name, payload, &PrecedingContext::group("NO_ID")).await
}

/// Like [`mock_context`], but with an explicit preceding context.
///
/// # Errors
///
/// [`FabricError::ContextParsing`] when the event cannot be composed.
pub async fn mock_context_in(
    name: &str,
    payload: Option<EventPayload>,
    preceding: &PrecedingContext,
) -> Result<EventContext, FabricError> {
    mock_factory().create(name, payload, preceding).await
}

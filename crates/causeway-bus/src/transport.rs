//! # Transport Capability Set
//!
//! What the dispatcher and context factory require of any transport: a
//! best-effort fan-out publish, name-keyed subscription, and an awaited
//! synchronous dispatch path for the initial-event entry point.

use async_trait::async_trait;
use causeway_types::{Delivery, Event, TransportError};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Reserved name subscribing a handler to every event.
pub const ANY_EVENT: &str = "ANY";

/// Future returned by a subscriber callback.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A subscriber callback, invoked once per delivered event.
pub type DeliveryHandler = Arc<dyn Fn(Delivery) -> HandlerFuture + Send + Sync>;

/// Transport capability set consumed by the dispatcher and context factory.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Best-effort fan-out of `event` to all subscribers of `name` (and the
    /// wildcard). Subscribers receive owned copies.
    ///
    /// # Returns
    ///
    /// The number of subscribers the event was handed to.
    ///
    /// # Errors
    ///
    /// Transport-specific publish failures; the in-memory bus never fails.
    async fn publish(&self, name: &str, event: Event) -> Result<usize, TransportError>;

    /// Register `handler` for events named `name`. [`ANY_EVENT`] subscribes
    /// to all events. Handlers under one name are invoked in registration
    /// order.
    fn subscribe(&self, name: &str, handler: DeliveryHandler);

    /// Synchronous-dispatch variant: deliver to all subscribers of the
    /// delivery's event name (plus wildcard) and resolve once all have
    /// completed.
    ///
    /// # Errors
    ///
    /// The first handler failure, after all handlers have run.
    async fn dispatch_context(&self, delivery: Delivery) -> anyhow::Result<()>;
}

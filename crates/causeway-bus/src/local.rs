//! # In-Memory Event Bus
//!
//! Single-process implementation of the transport capability set: an explicit
//! registry mapping each event name to an ordered list of handler callbacks,
//! plus a separate wildcard list consulted on every dispatch.
//!
//! `publish` is fire-and-forget — each subscriber runs as an independently
//! scheduled task. `dispatch_context` runs every matching handler and awaits
//! them all, propagating the first failure to the caller.

use crate::transport::{DeliveryHandler, EventTransport, ANY_EVENT};
use async_trait::async_trait;
use causeway_types::{Delivery, Event, TransportError};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// In-memory implementation of the event bus.
///
/// Suitable for single-node operation; distributed deployments implement
/// [`EventTransport`] over their own fabric.
#[derive(Default)]
pub struct InMemoryEventBus {
    /// Handlers keyed by event name, in registration order.
    handlers: RwLock<HashMap<String, Vec<DeliveryHandler>>>,

    /// Handlers subscribed to every event.
    wildcard: RwLock<Vec<DeliveryHandler>>,

    /// Total events published.
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    /// Create a new, empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of events published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Number of handlers registered under `name` (wildcard excluded).
    #[must_use]
    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }

    /// All handlers that should see an event named `name`: the name's own
    /// list in registration order, then the wildcard list.
    fn matching_handlers(&self, name: &str) -> Vec<DeliveryHandler> {
        let mut matching: Vec<DeliveryHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        matching.extend(
            self.wildcard
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .cloned(),
        );
        matching
    }
}

#[async_trait]
impl EventTransport for InMemoryEventBus {
    async fn publish(&self, name: &str, event: Event) -> Result<usize, TransportError> {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let matching = self.matching_handlers(name);
        if matching.is_empty() {
            warn!(event = name, "Event dropped (no subscribers)");
            return Ok(0);
        }

        let receivers = matching.len();
        for handler in matching {
            // Each subscriber gets its own structurally-equal copy.
            let delivery = Delivery::transport(event.clone());
            let event_name = name.to_string();
            tokio::spawn(async move {
                if let Err(e) = handler(delivery).await {
                    // Fan-out failures stop here; the dispatcher's guard has
                    // already converted anything it could into error events.
                    warn!(event = %event_name, error = %e, "Subscriber failed on fan-out delivery");
                }
            });
        }

        debug!(event = name, receivers, "Event published");
        Ok(receivers)
    }

    fn subscribe(&self, name: &str, handler: DeliveryHandler) {
        if name == ANY_EVENT {
            self.wildcard
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handler);
            debug!("Wildcard subscription created");
            return;
        }

        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(handler);
        debug!(event = name, "Subscription created");
    }

    async fn dispatch_context(&self, delivery: Delivery) -> anyhow::Result<()> {
        let name = delivery.name().to_string();
        let matching = self.matching_handlers(&name);

        debug!(event = %name, receivers = matching.len(), "Dispatching context");
        let results = join_all(matching.into_iter().map(|handler| handler(delivery.clone()))).await;

        results.into_iter().collect::<anyhow::Result<Vec<_>>>()?;
        Ok(())
    }
}

//! # Transport Deliveries
//!
//! What a subscriber receives from the transport: the event plus its origin.
//! A `Transport` delivery is a fan-out copy; a `Chained` delivery is an
//! in-process synchronous dispatch carrying the shared response slot, so a
//! handler's response is visible to the caller awaiting the dispatch.
//!
//! Deliveries carry data, never live capability — the dispatcher rewraps them
//! into contexts with emission handles on its own side.

use crate::event::Event;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared scratch slot a handler may populate with a response.
///
/// Holds an open JSON value: typically an HTTP-ish
/// `{"statusCode": ..., "body": ...}` object, but any serializable value
/// (a reply event, say) is accepted.
#[derive(Debug, Clone, Default)]
pub struct ResponseSlot(Arc<Mutex<Option<Value>>>);

impl ResponseSlot {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot's value.
    pub fn set(&self, value: Value) {
        *self.lock() = Some(value);
    }

    /// Store an HTTP-ish `{statusCode, body}` response.
    pub fn respond(&self, status_code: u16, body: Value) {
        self.set(serde_json::json!({
            "statusCode": status_code,
            "body": body,
        }));
    }

    /// Take the value out, leaving the slot empty.
    #[must_use]
    pub fn take(&self) -> Option<Value> {
        self.lock().take()
    }

    /// Clone the current value.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        self.lock().clone()
    }

    /// True when a non-empty value is present (`null`, `{}`, `[]`, and `""`
    /// count as empty).
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.lock().as_ref().is_some_and(|v| !is_empty_value(v))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Where a delivery came from.
#[derive(Debug, Clone)]
pub enum DeliveryOrigin {
    /// Asynchronous fan-out from the transport.
    Transport,
    /// Synchronous in-process dispatch; the caller awaits all handlers and
    /// observes the shared response slot.
    Chained {
        /// Response slot shared with the dispatching caller.
        response: ResponseSlot,
    },
}

/// One event handed to one subscriber.
#[derive(Debug, Clone)]
pub struct Delivery {
    event: Event,
    origin: DeliveryOrigin,
}

impl Delivery {
    /// A fan-out delivery.
    #[must_use]
    pub fn transport(event: Event) -> Self {
        Self {
            event,
            origin: DeliveryOrigin::Transport,
        }
    }

    /// A chained synchronous delivery sharing `response` with the caller.
    #[must_use]
    pub fn chained(event: Event, response: ResponseSlot) -> Self {
        Self {
            event,
            origin: DeliveryOrigin::Chained { response },
        }
    }

    /// The delivered event.
    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// The delivered event's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.event.name()
    }

    /// True for in-process chained dispatches.
    #[must_use]
    pub fn is_chained(&self) -> bool {
        matches!(self.origin, DeliveryOrigin::Chained { .. })
    }

    /// Split into the event and its origin.
    #[must_use]
    pub fn into_parts(self) -> (Event, DeliveryOrigin) {
        (self.event, self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_slot_is_not_populated() {
        let slot = ResponseSlot::new();
        assert!(!slot.is_populated());
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_empty_values_do_not_populate() {
        for empty in [json!(null), json!({}), json!([]), json!("")] {
            let slot = ResponseSlot::new();
            slot.set(empty);
            assert!(!slot.is_populated());
        }
    }

    #[test]
    fn test_respond_builds_status_and_body() {
        let slot = ResponseSlot::new();
        slot.respond(200, json!({"hello": "world"}));
        assert!(slot.is_populated());

        let value = slot.take().unwrap();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["body"]["hello"], "world");
        assert!(!slot.is_populated());
    }

    #[test]
    fn test_clones_share_the_same_slot() {
        let slot = ResponseSlot::new();
        let other = slot.clone();
        other.set(json!({"seen": true}));
        assert!(slot.is_populated());
    }
}

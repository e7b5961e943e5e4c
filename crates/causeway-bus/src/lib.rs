//! # Causeway Bus - Event Transport for the Causal Fabric
//!
//! The transport capability set the dispatcher consumes, and the bundled
//! in-memory implementation.
//!
//! ## Delivery Paths
//!
//! ```text
//! ┌──────────────┐   publish()    ┌──────────────┐   spawned task   ┌──────────┐
//! │  Emitter     │ ─────────────→ │  Event Bus   │ ───────────────→ │ Handler  │
//! └──────────────┘  fire-and-     └──────────────┘  one per         └──────────┘
//!                   forget               │          subscriber
//!                                        │
//!                   dispatch_context()   │ awaited, all handlers,
//!                 ─────────────────────→ │ first failure propagates
//! ```
//!
//! Subscribers receive owned, structurally-equal copies — a sender's frozen
//! event can never be mutated through the bus.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod local;
pub mod transport;

// Re-export main types
pub use local::InMemoryEventBus;
pub use transport::{DeliveryHandler, EventTransport, HandlerFuture, ANY_EVENT};

// The transport error kind lives with the shared taxonomy.
pub use causeway_types::TransportError;

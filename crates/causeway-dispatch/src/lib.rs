//! # Causeway Dispatch - Guarded Handlers over the Causal Fabric
//!
//! Turns raw transport deliveries into guarded handler invocations:
//!
//! ```text
//! transport ──delivery──→ [EventDispatcher] ──EventContext──→ handler(ctx)
//!                               │                                 │
//!                     error containment                 ctx.emit_event(..)
//!                     (ERR_UNHANDLED /                  ctx.emit_request(..)
//!                      ERROR_FAILED_CONTEXT_PARSING)        │
//!                                                   [CorrelationStore]
//! ```
//!
//! Handlers receive an [`EventContext`] pairing the handled event with the
//! capability to emit causal descendants — fire-and-forget via
//! [`EventContext::emit_event`], or request/await-reply via
//! [`EventContext::emit_request`] which parks on the correlation store until
//! a registered response releases it.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod context;
pub mod dispatcher;
pub mod factory;
pub mod store;
pub mod testing;

// Re-export main types
pub use context::EventContext;
pub use dispatcher::{
    EventDispatcher, SyncOutcome, ERROR_FAILED_CONTEXT_PARSING, ERROR_GROUP_ID, ERR_UNHANDLED,
    HEALTH_CHECK,
};
pub use factory::ContextFactory;
pub use store::CorrelationStore;

//! # Causeway Correlation - Park/Release for Request/Await-Reply
//!
//! One handler parks on a correlation id; a later reply releases it with the
//! reply event as payload. Each id is single-writer/single-reader and
//! resolved at most once.
//!
//! ## Backends
//!
//! - [`InProcessCorrelation`]: single-process table of single-shot tickets.
//!   No timeout — a wait parks indefinitely. A release with no waiter is
//!   contractually undefined.
//! - [`KeyedQueueCorrelation`]: durable keyed-queue design. A release pushes
//!   the payload; a wait performs a bounded blocking pop. Push-before-pop
//!   means a release that precedes the wait is queued, never lost, and the
//!   bound makes an unanswered wait fail fast and retryable.
//!
//! The two deliberately disagree about timeouts and orphaned releases; see
//! the backend docs before swapping one for the other.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod backend;
pub mod in_process;
pub mod keyed_queue;

// Re-export main types
pub use backend::CorrelationBackend;
pub use in_process::InProcessCorrelation;
pub use keyed_queue::{InMemoryKeyedQueue, KeyedQueue, KeyedQueueCorrelation, RELEASE_POLL_TIMEOUT};

// The correlation error kind lives with the shared taxonomy.
pub use causeway_types::CorrelationError;

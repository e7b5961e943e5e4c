//! # Causeway Types Crate
//!
//! Shared value types for the causal event fabric: the immutable [`Event`]
//! record, the [`PrecedingContext`] seed it is derived from, provenance
//! constants, correlation identifiers, transport deliveries, and the error
//! taxonomy used across all fabric crates.
//!
//! ## Design Principles
//!
//! - **Immutability by construction**: events are value types produced once
//!   by the [`EventComposer`]; they expose accessors, never mutators.
//! - **Data/capability split**: what crosses the transport is a plain
//!   serializable [`Delivery`] record, never a live handle.
//! - **Explicit provenance**: source constants are injected via
//!   [`SourceInfo`], not read from ambient process state.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod correlation;
pub mod delivery;
pub mod errors;
pub mod event;
pub mod identity;
pub mod source;

pub use correlation::CorrelationId;
pub use delivery::{Delivery, DeliveryOrigin, ResponseSlot};
pub use errors::{CorrelationError, ErrorPayload, FabricError, TransportError};
pub use event::{AlertKind, Event, PrecedingContext, EVENT_VERSION};
pub use identity::{EventComposer, EventPayload};
pub use source::SourceInfo;

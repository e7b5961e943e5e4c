//! # Error Containment Across the Fabric
//!
//! A crashing handler must never take the transport down: the failure is
//! logged, reported as `ERR_UNHANDLED` through the same fabric as ordinary
//! events, and the rest of the system keeps serving.

//! # Integration Tests Crate
//!
//! Cross-crate tests that wire the whole fabric together — bus, correlation
//! backend, dispatchers — and drive it the way cooperating services would.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! ├── src/
//! │   ├── lib.rs          # This file + shared harness
//! │   ├── choreography.rs # Request/await-reply end to end, both backends
//! │   ├── asymmetry.rs    # In-process vs keyed-queue backend contracts
//! │   └── containment.rs  # Error containment across the fabric
//! ```
//!
//! ## Flows
//!
//! 1. **Requester → Bus → Responder → Bus → Release**: `SOMETHING_HAPPENED`
//!    triggers `emit_request("DO_SOMETHING_REQUESTED")`; the responder emits
//!    `DO_SOMETHING_REPLIED`; a response registration releases the wait.
//! 2. **Backend asymmetry**: the keyed-queue backend bounds waits and queues
//!    early releases; the in-process backend parks forever and rejects
//!    orphaned releases. Both are designed behavior.
//! 3. **Containment**: a crashing handler never takes the transport down.

pub mod asymmetry;
pub mod choreography;
pub mod containment;

use causeway_bus::InMemoryEventBus;
use causeway_correlation::CorrelationBackend;
use causeway_dispatch::EventDispatcher;
use causeway_types::SourceInfo;
use std::sync::Arc;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Two dispatchers sharing one bus and one correlation backend, playing the
/// requester and responder services.
pub struct Fabric {
    /// The shared in-memory transport.
    pub bus: Arc<InMemoryEventBus>,
    /// Service issuing requests.
    pub requester: EventDispatcher,
    /// Service answering them.
    pub responder: EventDispatcher,
}

impl Fabric {
    /// Wire both services over `backend`.
    #[must_use]
    pub fn over(backend: Arc<dyn CorrelationBackend>) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let requester = EventDispatcher::new(
            bus.clone(),
            backend.clone(),
            SourceInfo::new("requester-service", "0.1.0"),
        );
        let responder = EventDispatcher::new(
            bus.clone(),
            backend,
            SourceInfo::new("responder-service", "0.1.0"),
        );
        Self {
            bus,
            requester,
            responder,
        }
    }
}

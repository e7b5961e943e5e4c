//! # Error Taxonomy
//!
//! Failure kinds shared across the fabric crates, plus the structural error
//! serialization used when an error travels as an event payload.
//!
//! The dispatcher's containment policy keys off these kinds: validation and
//! context-parsing failures are terminal and converted to error events;
//! handler failures are re-signaled only to in-process chained callers;
//! correlation timeouts are retryable.

use crate::correlation::CorrelationId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building, publishing, or dispatching events.
#[derive(Debug, Error)]
pub enum FabricError {
    /// Malformed or insufficient causal input. Terminal, not retryable.
    #[error("invalid causal input: {reason}")]
    Validation {
        /// What was missing or malformed.
        reason: String,
    },

    /// Failed to construct or publish an event. The dispatcher converts this
    /// into a dedicated error event instead of crashing.
    #[error("failed to build or publish event")]
    ContextParsing {
        /// The underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A business handler failed. Reported via `ERR_UNHANDLED`; re-signaled
    /// only to synchronous in-process callers.
    #[error("event handler failed")]
    HandlerExecution {
        /// The handler's failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A correlation wait or release failed.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// The transport rejected an operation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Canonical serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FabricError {
    /// Stable name for this failure kind, used as the `name` of a
    /// structurally serialized error payload.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::ContextParsing { .. } => "ContextParsingError",
            Self::HandlerExecution { .. } => "HandlerExecutionError",
            Self::Correlation(CorrelationError::Timeout { .. }) => "BackendTimeoutError",
            Self::Correlation(_) => "CorrelationError",
            Self::Transport(_) => "TransportError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    /// True for context-parsing failures, which the dispatcher must convert
    /// rather than re-signal.
    #[must_use]
    pub fn is_context_parsing(&self) -> bool {
        matches!(self, Self::ContextParsing { .. })
    }
}

/// Errors from the correlation park/release primitive.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// The bounded wait elapsed without a release. Retryable; distinct from
    /// a handler bug.
    #[error("correlation wait for {key} exceeded its {waited_ms} ms bound")]
    Timeout {
        /// The correlation id that was awaited.
        key: CorrelationId,
        /// How long the backend polled before giving up.
        waited_ms: u64,
    },

    /// A release arrived with no pending waiter. In-process backend only;
    /// contractually undefined and must not be relied upon.
    #[error("no pending waiter for correlation id {0}")]
    NoPendingWaiter(CorrelationId),

    /// The waiting side went away before the release arrived.
    #[error("correlation ticket for {0} was dropped before release")]
    TicketDropped(CorrelationId),

    /// Backend-specific failure (connection, serialization of the queued
    /// payload, ...).
    #[error("correlation backend failure: {0}")]
    Backend(String),
}

impl CorrelationError {
    /// Whether the caller may retry the wait.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors from the event transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The fan-out publish was rejected.
    #[error("transport rejected publish of {name}: {reason}")]
    PublishFailed {
        /// Event name that failed to publish.
        name: String,
        /// Transport-specific reason.
        reason: String,
    },

    /// The transport is shut down.
    #[error("transport closed")]
    Closed,
}

/// Structural serialization of an error, used as the payload of error events
/// and of structured failure responses.
///
/// `stack` carries the error's source chain, outermost cause first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Failure kind name.
    pub name: String,
    /// Top-level message.
    pub message: String,
    /// Source chain, one frame per cause.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,
}

impl ErrorPayload {
    /// Serialize a plain error and its source chain.
    #[must_use]
    pub fn from_std(err: &(dyn std::error::Error + 'static)) -> Self {
        let name = err
            .downcast_ref::<FabricError>()
            .map_or("Error", FabricError::kind_name);
        let mut stack = Vec::new();
        let mut cause = err.source();
        while let Some(c) = cause {
            stack.push(c.to_string());
            cause = c.source();
        }
        Self {
            name: name.to_string(),
            message: err.to_string(),
            stack,
        }
    }

    /// Serialize a propagated handler error and its chain.
    ///
    /// The payload name is the innermost [`FabricError`] kind when one is in
    /// the chain, `"Error"` otherwise.
    #[must_use]
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let name = err
            .chain()
            .find_map(|c| c.downcast_ref::<FabricError>())
            .map_or("Error", FabricError::kind_name);
        Self {
            name: name.to_string(),
            message: err.to_string(),
            stack: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}

impl From<&FabricError> for ErrorPayload {
    fn from(err: &FabricError) -> Self {
        let mut payload = Self::from_std(err);
        payload.name = err.kind_name().to_string();
        payload
    }
}

//! # Event Dispatcher
//!
//! Registers guarded handlers per event name. The guard materializes a
//! context for every delivery, logs entry and exit, and contains failures
//! uniformly: bad input becomes a dedicated error event, a crashed handler
//! becomes `ERR_UNHANDLED` on the fabric, and only a synchronous in-process
//! caller ever observes the failure directly.

use crate::context::EventContext;
use crate::factory::ContextFactory;
use crate::store::CorrelationStore;
use anyhow::Context as _;
use causeway_bus::{DeliveryHandler, EventTransport};
use causeway_correlation::CorrelationBackend;
use causeway_types::{
    Delivery, ErrorPayload, EventComposer, EventPayload, FabricError, PrecedingContext, SourceInfo,
};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Emitted when a handler fails on an ordinary delivery.
pub const ERR_UNHANDLED: &str = "ERR_UNHANDLED";

/// Emitted when an event could not be built or published.
pub const ERROR_FAILED_CONTEXT_PARSING: &str = "ERROR_FAILED_CONTEXT_PARSING";

/// Always-registered health probe name.
pub const HEALTH_CHECK: &str = "HEALTH_CHECK";

/// Reserved group scope for error events that have no usable causal input.
pub const ERROR_GROUP_ID: &str = "ERR";

fn error_event_context() -> PrecedingContext {
    PrecedingContext::group(ERROR_GROUP_ID)
}

/// Outcome of the synchronous entry point.
///
/// Success yields the handler-populated response or the raw context; any
/// internal failure yields a fixed-shape `{statusCode: 500, body}` response
/// instead of an error.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The populated response slot (or a structured failure response).
    Response(Value),
    /// No handler populated a response; the initial context itself.
    Context(EventContext),
}

impl SyncOutcome {
    /// The response value, if this outcome is one.
    #[must_use]
    pub fn response(&self) -> Option<&Value> {
        match self {
            Self::Response(value) => Some(value),
            Self::Context(_) => None,
        }
    }

    /// Consume into the response value, if this outcome is one.
    #[must_use]
    pub fn into_response(self) -> Option<Value> {
        match self {
            Self::Response(value) => Some(value),
            Self::Context(_) => None,
        }
    }

    /// True when no handler populated a response.
    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(self, Self::Context(_))
    }
}

/// Registers handlers per event name and guards their invocation.
pub struct EventDispatcher {
    transport: Arc<dyn EventTransport>,
    factory: ContextFactory,
}

impl EventDispatcher {
    /// Wire a dispatcher to a transport and correlation backend.
    ///
    /// A health-check handler is always registered under [`HEALTH_CHECK`].
    #[must_use]
    pub fn new(
        transport: Arc<dyn EventTransport>,
        backend: Arc<dyn CorrelationBackend>,
        source: SourceInfo,
    ) -> Self {
        let store = CorrelationStore::new(backend);
        let factory = ContextFactory::new(EventComposer::new(source), transport.clone(), store);
        let dispatcher = Self { transport, factory };
        dispatcher.register_event_handler(HEALTH_CHECK, |_ctx| async { Ok(()) });
        dispatcher
    }

    /// The factory this dispatcher materializes contexts with.
    #[must_use]
    pub fn context_factory(&self) -> ContextFactory {
        self.factory.clone()
    }

    /// Subscribe `handler` under `event_name`, wrapped in the dispatch guard.
    ///
    /// On every delivery the guard materializes an [`EventContext`] (reusing
    /// a chained delivery's response slot), invokes the handler, and contains
    /// any failure per the fabric's policy.
    pub fn register_event_handler<F, Fut>(&self, event_name: &str, handler: F)
    where
        F: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let factory = self.factory.clone();
        let registered = event_name.to_string();
        let handler = Arc::new(handler);

        let wrapper: DeliveryHandler = Arc::new(move |delivery: Delivery| {
            let factory = factory.clone();
            let registered = registered.clone();
            let handler = handler.clone();
            Box::pin(async move {
                let chained = delivery.is_chained();
                let ctx = factory.from_delivery(delivery);

                debug!(
                    event = %ctx.event().name(),
                    handler = %registered,
                    payload = ?ctx.event().payload(),
                    "Executing handler"
                );
                match handler.as_ref()(ctx.clone()).await {
                    Ok(()) => {
                        debug!(event = %ctx.event().name(), handler = %registered, "Handler exited");
                        Ok(())
                    }
                    Err(failure) => contain_failure(&factory, &ctx, chained, failure).await,
                }
            })
        });

        self.transport.subscribe(event_name, wrapper);
    }

    /// Counterpart of [`EventContext::emit_request`]: on receiving
    /// `reply_name`, release the correlation ticket identified by the
    /// event's correlation id, with the event as payload.
    pub fn register_response(&self, reply_name: &str) {
        let store = self.factory.store().clone();
        self.register_event_handler(reply_name, move |ctx| {
            let store = store.clone();
            async move {
                let corr_id = ctx.corr_id().with_context(|| {
                    format!("reply event {} carries no correlation id", ctx.event().name())
                })?;
                store.respond(corr_id, ctx.event().clone()).await?;
                Ok(())
            }
        });
    }

    /// Create the initial context, drive the transport's awaited dispatch
    /// path, and return the populated response slot (any `body` field
    /// serialized to a JSON string) — or the context itself when no handler
    /// responded.
    ///
    /// This entry point never propagates an error past its own boundary:
    /// every failure becomes a `{statusCode: 500, body}` response, and a
    /// context-parsing failure is additionally reported on the fabric.
    pub async fn emit_initial_event_sync(
        &self,
        name: &str,
        payload: Option<EventPayload>,
        preceding: &PrecedingContext,
    ) -> SyncOutcome {
        match self.drive_initial(name, payload, preceding).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                error!(event = name, error = ?failure, "Synchronous dispatch failed");
                if is_context_parsing(&failure) {
                    if let Err(e) = self
                        .factory
                        .create(
                            ERROR_FAILED_CONTEXT_PARSING,
                            Some(EventPayload::from_anyhow(&failure)),
                            &error_event_context(),
                        )
                        .await
                    {
                        error!(error = %e, "Failed to report the context-parsing failure");
                    }
                }
                SyncOutcome::Response(failure_response(&failure))
            }
        }
    }

    async fn drive_initial(
        &self,
        name: &str,
        payload: Option<EventPayload>,
        preceding: &PrecedingContext,
    ) -> anyhow::Result<SyncOutcome> {
        let ctx = self.factory.create(name, payload, preceding).await?;

        let delivery = Delivery::chained(ctx.event().clone(), ctx.response().clone());
        self.transport.dispatch_context(delivery).await?;

        if ctx.response().is_populated() {
            let mut response = ctx.response().get().unwrap_or(Value::Null);
            stringify_body(&mut response)?;
            return Ok(SyncOutcome::Response(response));
        }
        Ok(SyncOutcome::Context(ctx))
    }
}

/// Uniform containment for a failed handler invocation.
///
/// Context-parsing failures are terminal: reported as a dedicated event
/// scoped to the reserved error group, then swallowed. Anything else flows
/// out as `ERR_UNHANDLED` through the context, and is re-signaled only when
/// the delivery was an in-process chained call.
async fn contain_failure(
    factory: &ContextFactory,
    ctx: &EventContext,
    chained: bool,
    failure: anyhow::Error,
) -> anyhow::Result<()> {
    error!(event = %ctx.event().name(), error = ?failure, "Handler failed");

    if is_context_parsing(&failure) {
        if let Err(e) = factory
            .create(
                ERROR_FAILED_CONTEXT_PARSING,
                Some(EventPayload::from_anyhow(&failure)),
                &error_event_context(),
            )
            .await
        {
            error!(error = %e, "Failed to report the context-parsing failure");
        }
        return Ok(());
    }

    if let Err(e) = ctx
        .emit_event(ERR_UNHANDLED, Some(EventPayload::from_anyhow(&failure)), None)
        .await
    {
        error!(error = %e, "Failed to emit ERR_UNHANDLED");
    }

    if chained {
        return Err(FabricError::HandlerExecution {
            source: failure.into(),
        }
        .into());
    }
    Ok(())
}

fn is_context_parsing(failure: &anyhow::Error) -> bool {
    failure
        .chain()
        .any(|cause| {
            cause
                .downcast_ref::<FabricError>()
                .is_some_and(FabricError::is_context_parsing)
        })
}

/// Serialize a truthy `body` field to a JSON string, in place.
fn stringify_body(response: &mut Value) -> anyhow::Result<()> {
    let Some(map) = response.as_object_mut() else {
        return Ok(());
    };
    let Some(body) = map.get("body").filter(|b| !b.is_null()) else {
        return Ok(());
    };
    let serialized = serde_json::to_string(body)?;
    map.insert("body".to_string(), Value::String(serialized));
    Ok(())
}

fn failure_response(failure: &anyhow::Error) -> Value {
    let payload = ErrorPayload::from_anyhow(failure);
    let body = serde_json::to_string(&payload).unwrap_or_else(|_| failure.to_string());
    json!({
        "statusCode": 500,
        "body": body,
    })
}

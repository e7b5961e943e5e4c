//! # Request/Await-Reply Choreography
//!
//! The full loop: handler A receives `SOMETHING_HAPPENED` and parks on
//! `emit_request("DO_SOMETHING_REQUESTED")`; handler B answers with
//! `emit_event("DO_SOMETHING_REPLIED", {hello: "world"})`; a response
//! registration on the reply name releases A's wait with the reply event.

use crate::Fabric;

/// Wire the requester/responder roles onto a fabric.
pub fn install_choreography(fabric: &Fabric) {
    fabric
        .requester
        .register_event_handler("SOMETHING_HAPPENED", |ctx| async move {
            let reply = ctx.emit_request("DO_SOMETHING_REQUESTED", None).await?;
            ctx.set_response(serde_json::to_value(&reply)?);
            Ok(())
        });
    fabric.requester.register_response("DO_SOMETHING_REPLIED");

    fabric
        .responder
        .register_event_handler("DO_SOMETHING_REQUESTED", |ctx| async move {
            ctx.emit_event(
                "DO_SOMETHING_REPLIED",
                Some(serde_json::json!({"hello": "world"}).into()),
                None,
            )
            .await?;
            Ok(())
        });
}

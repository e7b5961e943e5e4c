//! # Event Identity
//!
//! Derives an event's identifier from its causal position so that re-deriving
//! the same logical event always yields the same identifier — the idempotence
//! property that makes at-least-once delivery safe to replay.
//!
//! A chain's root event gets a random v4 id (there is nothing to derive
//! from); every descendant gets a deterministic v5 id namespaced under its
//! predecessor and named by the canonical serialization of its causal fields,
//! name, and normalized payload.

use crate::correlation::CorrelationId;
use crate::errors::{ErrorPayload, FabricError};
use crate::event::{unix_millis, AlertKind, Event, PrecedingContext, EVENT_VERSION};
use crate::source::SourceInfo;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Top-level payload keys treated as error nodes. Detection is shallow —
/// one level, never recursive — and the mapping is left otherwise untouched.
const ERROR_NODE_KEYS: [&str; 3] = ["error", "e", "err"];

/// A payload handed to the composer: either a plain JSON value or an error
/// serialized structurally.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// Arbitrary JSON payload.
    Value(Value),
    /// An error, serialized as `{name, message, stack}`.
    Error(ErrorPayload),
}

impl EventPayload {
    /// Structurally capture a plain error and its source chain.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::Error(ErrorPayload::from_std(err))
    }

    /// Structurally capture a propagated handler error.
    #[must_use]
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self::Error(ErrorPayload::from_anyhow(err))
    }

    /// Normalize to the wire payload. Error payloads become their structural
    /// form; null collapses to no payload; plain mappings are scanned
    /// shallowly for an error node but left untouched either way.
    pub(crate) fn normalize(self) -> Option<Value> {
        match self {
            Self::Error(err) => serde_json::to_value(err).ok(),
            Self::Value(Value::Null) => None,
            Self::Value(value) => {
                if let Some(key) = detect_error_node(&value) {
                    debug!(key, "payload carries a top-level error node");
                }
                Some(value)
            }
        }
    }
}

impl From<Value> for EventPayload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ErrorPayload> for EventPayload {
    fn from(err: ErrorPayload) -> Self {
        Self::Error(err)
    }
}

fn detect_error_node(payload: &Value) -> Option<&'static str> {
    let map = payload.as_object()?;
    ERROR_NODE_KEYS.into_iter().find(|key| map.contains_key(*key))
}

/// Causal fields of a new event: scope and chain position inherited from the
/// preceding context, merged with the injected provenance constants.
///
/// Serialization order is fixed; absent fields are skipped. The serialized
/// form is one half of the deterministic identity's name-string, so this
/// struct is the canonical causal serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct CausalFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    corr_id: Option<CorrelationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_type: Option<String>,
    source_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    os_version: Option<String>,
}

/// The other half of the name-string: what the event says.
#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct IdentityInput<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

/// Builds immutable event records and computes their identifiers.
#[derive(Debug, Clone)]
pub struct EventComposer {
    source: SourceInfo,
}

impl EventComposer {
    /// A composer stamping the given provenance into every event.
    #[must_use]
    pub fn new(source: SourceInfo) -> Self {
        Self { source }
    }

    /// The injected provenance constants.
    #[must_use]
    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    /// Build the next event of a chain.
    ///
    /// `preceding` is either a bare scope descriptor (the new event roots a
    /// chain) or the projection of a previously emitted event.
    ///
    /// # Errors
    ///
    /// `FabricError::Validation` when `preceding` carries no non-empty scope
    /// id — terminal, not retryable.
    pub fn compose(
        &self,
        name: &str,
        payload: Option<EventPayload>,
        preceding: &PrecedingContext,
    ) -> Result<Event, FabricError> {
        if !preceding.has_scope_id() {
            return Err(FabricError::Validation {
                reason: "no scope ids provided, can not create a new event".to_string(),
            });
        }

        let causal = self.causal_fields(preceding);
        let payload = payload.and_then(EventPayload::normalize);
        let id = derive_id(name, payload.as_ref(), &causal, preceding)?;
        let initial_event_id = causal.initial_event_id.unwrap_or(id);

        Ok(Event {
            id,
            version: EVENT_VERSION.to_string(),
            name: name.to_string(),
            timestamp: unix_millis(),
            is_trigger: preceding.name.is_none(),
            has_alert: AlertKind::classify(name),
            payload,
            user_id: causal.user_id,
            device_id: causal.device_id,
            group_id: causal.group_id,
            initial_event_id,
            corr_id: causal.corr_id,
            source_type: causal.source_type,
            source_version: causal.source_version,
            os: causal.os,
            os_version: causal.os_version,
        })
    }

    fn causal_fields(&self, preceding: &PrecedingContext) -> CausalFields {
        CausalFields {
            user_id: non_empty(preceding.user_id.as_deref()),
            device_id: non_empty(preceding.device_id.as_deref()),
            group_id: non_empty(preceding.group_id.as_deref()),
            initial_event_id: preceding.initial_event_id,
            corr_id: preceding.corr_id,
            source_type: self.source.source_type.clone(),
            source_version: self.source.source_version.clone(),
            os: self.source.os.clone(),
            os_version: self.source.os_version.clone(),
        }
    }
}

impl Default for EventComposer {
    fn default() -> Self {
        Self::new(SourceInfo::default())
    }
}

/// Root events get a random id; descendants a deterministic one. The v5
/// namespace is the preceding event's id when known, else the chain root's,
/// so replays of the same logical event always collide on the same id.
fn derive_id(
    name: &str,
    payload: Option<&Value>,
    causal: &CausalFields,
    preceding: &PrecedingContext,
) -> Result<Uuid, FabricError> {
    let Some(initial_event_id) = causal.initial_event_id else {
        return Ok(Uuid::new_v4());
    };

    let namespace = preceding.id.unwrap_or(initial_event_id);
    let name_string = format!(
        "{}{}",
        serde_json::to_string(causal)?,
        serde_json::to_string(&IdentityInput { name, payload })?,
    );

    Ok(Uuid::new_v5(&namespace, name_string.as_bytes()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn composer() -> EventComposer {
        EventComposer::new(SourceInfo::new("test-service", "0.0.2").with_os("linux", "18.04"))
    }

    fn descendant_seed() -> PrecedingContext {
        PrecedingContext {
            group_id: Some("NO_ID".into()),
            initial_event_id: Some(Uuid::new_v4()),
            id: Some(Uuid::new_v4()),
            name: Some("MOCK_EVENT_1".into()),
            ..PrecedingContext::default()
        }
    }

    #[test]
    fn test_compose_fails_without_scope_ids() {
        let err = composer()
            .compose("MOCK_EVENT", None, &PrecedingContext::default())
            .unwrap_err();
        assert!(matches!(err, FabricError::Validation { .. }));

        let empty_scope = PrecedingContext::user("");
        let err = composer().compose("MOCK_EVENT", None, &empty_scope).unwrap_err();
        assert!(matches!(err, FabricError::Validation { .. }));
    }

    #[test]
    fn test_root_event_marks_itself_as_chain_root() {
        let event = composer()
            .compose("MOCK_EVENT", None, &PrecedingContext::group("NO_ID"))
            .unwrap();

        assert!(event.is_trigger());
        assert_eq!(event.initial_event_id(), event.id());
        assert_eq!(event.version(), EVENT_VERSION);
        assert_eq!(event.source_type(), Some("test-service"));
        assert_eq!(event.source_version(), "0.0.2");
    }

    #[test]
    fn test_descendant_inherits_the_root_id() {
        let seed = descendant_seed();
        let event = composer().compose("MOCK_EVENT", None, &seed).unwrap();

        assert!(!event.is_trigger());
        assert_ne!(event.initial_event_id(), event.id());
        assert_eq!(Some(event.initial_event_id()), seed.initial_event_id);
    }

    #[test]
    fn test_sequential_descendants_share_one_root() {
        let composer = composer();
        let root = composer
            .compose("FIRST_EVENT", None, &PrecedingContext::group("NO_ID"))
            .unwrap();

        let mut preceding = root.as_preceding();
        for i in 0..10 {
            let event = composer
                .compose(&format!("EVENT_{i}"), None, &preceding)
                .unwrap();
            assert_eq!(event.initial_event_id(), root.id());
            preceding = event.as_preceding();
        }
    }

    #[test]
    fn test_derived_id_is_deterministic() {
        let composer = composer();
        let seed = descendant_seed();
        let payload = json!({"A": "a", "B": "b"});

        let reference = composer
            .compose("MOCK_EVENT", Some(payload.clone().into()), &seed)
            .unwrap();
        for _ in 0..100 {
            let event = composer
                .compose("MOCK_EVENT", Some(payload.clone().into()), &seed)
                .unwrap();
            assert_eq!(event.id(), reference.id());
        }
    }

    #[test]
    fn test_id_changes_with_name_payload_and_scope() {
        let composer = composer();
        let seed = descendant_seed();
        let payload = json!({"A": "a"});

        let reference = composer
            .compose("MOCK_EVENT", Some(payload.clone().into()), &seed)
            .unwrap();

        let other_name = composer
            .compose("OTHER_EVENT", Some(payload.clone().into()), &seed)
            .unwrap();
        assert_ne!(other_name.id(), reference.id());

        let other_payload = composer
            .compose("MOCK_EVENT", Some(json!({"A": "b"}).into()), &seed)
            .unwrap();
        assert_ne!(other_payload.id(), reference.id());

        let mut other_scope = descendant_seed();
        other_scope.initial_event_id = seed.initial_event_id;
        other_scope.id = seed.id;
        other_scope.user_id = Some("u-1".into());
        let other_scope = composer
            .compose("MOCK_EVENT", Some(payload.into()), &other_scope)
            .unwrap();
        assert_ne!(other_scope.id(), reference.id());
    }

    #[test]
    fn test_independent_roots_never_share_a_chain() {
        let composer = composer();
        let a = composer
            .compose("MOCK_EVENT", None, &PrecedingContext::group("NO_ID"))
            .unwrap();
        let b = composer
            .compose("MOCK_EVENT", None, &PrecedingContext::group("NO_ID"))
            .unwrap();
        assert_ne!(a.initial_event_id(), b.initial_event_id());
    }

    #[test]
    fn test_namespace_falls_back_to_chain_root_without_preceding_id() {
        let composer = composer();
        let mut seed = descendant_seed();
        seed.id = None;

        let first = composer.compose("MOCK_EVENT", None, &seed).unwrap();
        let second = composer.compose("MOCK_EVENT", None, &seed).unwrap();
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn test_alert_prefixes_classify() {
        let composer = composer();
        let scope = PrecedingContext::group("NO_ID");

        let err = composer.compose("ERR_UNHANDLED", None, &scope).unwrap();
        assert_eq!(err.has_alert(), Some(AlertKind::Err));

        let warn = composer.compose("WARN_LOW_DISK", None, &scope).unwrap();
        assert_eq!(warn.has_alert(), Some(AlertKind::Warn));

        let plain = composer.compose("SOMETHING_HAPPENED", None, &scope).unwrap();
        assert_eq!(plain.has_alert(), None);
    }

    #[test]
    fn test_error_payload_serializes_structurally() {
        let inner = FabricError::Validation {
            reason: "no scope ids provided".into(),
        };
        let outer = FabricError::ContextParsing {
            source: Box::new(inner),
        };

        let event = composer()
            .compose(
                "ERR_UNHANDLED",
                Some(EventPayload::from_error(&outer)),
                &PrecedingContext::group("ERR"),
            )
            .unwrap();

        let payload = event.payload().unwrap();
        assert_eq!(payload["name"], "ContextParsingError");
        assert_eq!(payload["message"], "failed to build or publish event");
        assert!(payload["stack"][0]
            .as_str()
            .unwrap()
            .contains("no scope ids provided"));
    }

    #[test]
    fn test_error_node_detection_is_shallow_and_non_destructive() {
        let payload = json!({"err": {"message": "boom"}, "other": 1});
        let event = composer()
            .compose(
                "MOCK_EVENT",
                Some(payload.clone().into()),
                &PrecedingContext::group("NO_ID"),
            )
            .unwrap();
        // The mapping is detected but left untouched.
        assert_eq!(event.payload(), Some(&payload));

        // Nested error nodes are not error nodes.
        let nested = json!({"outer": {"error": "boom"}});
        assert_eq!(detect_error_node(&nested), None);
        assert_eq!(detect_error_node(&json!({"e": 1})), Some("e"));
        assert_eq!(detect_error_node(&json!({"error": 1})), Some("error"));
    }

    #[test]
    fn test_null_payload_collapses_to_absent() {
        let event = composer()
            .compose(
                "MOCK_EVENT",
                Some(json!(null).into()),
                &PrecedingContext::group("NO_ID"),
            )
            .unwrap();
        assert_eq!(event.payload(), None);
    }

    #[test]
    fn test_empty_scope_ids_are_stripped_when_another_is_present() {
        let seed = PrecedingContext {
            user_id: Some(String::new()),
            group_id: Some("NO_ID".into()),
            ..PrecedingContext::default()
        };
        let event = composer().compose("MOCK_EVENT", None, &seed).unwrap();
        assert_eq!(event.user_id(), None);
        assert_eq!(event.group_id(), Some("NO_ID"));
    }

    #[test]
    fn test_corr_id_is_carried_into_the_record() {
        let corr = CorrelationId::new();
        let seed = PrecedingContext::group("NO_ID").with_corr_id(corr);
        let event = composer().compose("DO_SOMETHING_REQUESTED", None, &seed).unwrap();
        assert_eq!(event.corr_id(), Some(corr));
    }
}

//! # Event Record
//!
//! The immutable, versioned event record exchanged between services, plus the
//! [`PrecedingContext`] seed a descendant event is derived from.
//!
//! Wire format uses SCREAMING_SNAKE_CASE field names; fields holding a falsy
//! value (empty scope id, null payload, unset flags) are stripped at
//! construction and never serialized.

use crate::correlation::CorrelationId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Schema version stamped into every event record.
pub const EVENT_VERSION: &str = "1.0";

/// Alert classification derived from the event name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// Name starts with `ERR`.
    #[serde(rename = "ERR")]
    Err,
    /// Name starts with `WARN`.
    #[serde(rename = "WARN")]
    Warn,
}

impl AlertKind {
    /// Classify an event name by prefix. Names outside the `ERR`/`WARN`
    /// families carry no alert.
    #[must_use]
    pub fn classify(event_name: &str) -> Option<Self> {
        if event_name.starts_with("ERR") {
            Some(Self::Err)
        } else if event_name.starts_with("WARN") {
            Some(Self::Warn)
        } else {
            None
        }
    }
}

/// An immutable event record.
///
/// Produced exactly once by [`crate::EventComposer`]; all fields are private
/// and reachable only through accessors, so a constructed record can never be
/// altered — the freeze is structural, not a runtime guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Event {
    pub(crate) id: Uuid,
    pub(crate) version: String,
    pub(crate) name: String,
    pub(crate) timestamp: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) is_trigger: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) has_alert: Option<AlertKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) group_id: Option<String>,
    pub(crate) initial_event_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) corr_id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) source_type: Option<String>,
    pub(crate) source_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) os_version: Option<String>,
}

impl Event {
    /// The derived event identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Event schema version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation time, milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Whether this event roots its causal chain.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    /// Alert classification, if the name carries one.
    #[must_use]
    pub fn has_alert(&self) -> Option<AlertKind> {
        self.has_alert
    }

    /// The normalized payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    /// User scope id.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Device scope id.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Group scope id.
    #[must_use]
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Identifier of the chain's root event.
    #[must_use]
    pub fn initial_event_id(&self) -> Uuid {
        self.initial_event_id
    }

    /// Correlation id, present on request/reply descendants.
    #[must_use]
    pub fn corr_id(&self) -> Option<CorrelationId> {
        self.corr_id
    }

    /// Emitting source type.
    #[must_use]
    pub fn source_type(&self) -> Option<&str> {
        self.source_type.as_deref()
    }

    /// Emitting source version.
    #[must_use]
    pub fn source_version(&self) -> &str {
        &self.source_version
    }

    /// Emitting host OS.
    #[must_use]
    pub fn os(&self) -> Option<&str> {
        self.os.as_deref()
    }

    /// Emitting host OS version.
    #[must_use]
    pub fn os_version(&self) -> Option<&str> {
        self.os_version.as_deref()
    }

    /// Project this event as the preceding context for a descendant.
    #[must_use]
    pub fn as_preceding(&self) -> PrecedingContext {
        PrecedingContext {
            user_id: self.user_id.clone(),
            device_id: self.device_id.clone(),
            group_id: self.group_id.clone(),
            initial_event_id: Some(self.initial_event_id),
            corr_id: self.corr_id,
            id: Some(self.id),
            name: Some(self.name.clone()),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The causal seed a new event is derived from.
///
/// Either a bare scope descriptor (no `name` — the next event becomes the
/// chain's trigger) or the projection of a previously emitted event via
/// [`Event::as_preceding`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct PrecedingContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corr_id: Option<CorrelationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PrecedingContext {
    /// Bare scope descriptor for a user.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Bare scope descriptor for a device.
    #[must_use]
    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }

    /// Bare scope descriptor for a group.
    #[must_use]
    pub fn group(group_id: impl Into<String>) -> Self {
        Self {
            group_id: Some(group_id.into()),
            ..Self::default()
        }
    }

    /// Attach a correlation id override.
    #[must_use]
    pub fn with_corr_id(mut self, corr_id: CorrelationId) -> Self {
        self.corr_id = Some(corr_id);
        self
    }

    /// True when at least one scope id is present and non-empty.
    #[must_use]
    pub fn has_scope_id(&self) -> bool {
        [&self.user_id, &self.device_id, &self.group_id]
            .into_iter()
            .any(|id| id.as_deref().is_some_and(|v| !v.is_empty()))
    }

    /// Merge this context over `base`; fields set here win on conflict.
    #[must_use]
    pub fn merged_over(self, base: &PrecedingContext) -> PrecedingContext {
        PrecedingContext {
            user_id: self.user_id.or_else(|| base.user_id.clone()),
            device_id: self.device_id.or_else(|| base.device_id.clone()),
            group_id: self.group_id.or_else(|| base.group_id.clone()),
            initial_event_id: self.initial_event_id.or(base.initial_event_id),
            corr_id: self.corr_id.or(base.corr_id),
            id: self.id.or(base.id),
            name: self.name.or_else(|| base.name.clone()),
        }
    }
}

/// Milliseconds since the Unix epoch; 0 on a pre-epoch clock.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_classification() {
        assert_eq!(AlertKind::classify("ERR_UNHANDLED"), Some(AlertKind::Err));
        assert_eq!(AlertKind::classify("ERROR_SOMETHING"), Some(AlertKind::Err));
        assert_eq!(AlertKind::classify("WARN_LOW_DISK"), Some(AlertKind::Warn));
        assert_eq!(AlertKind::classify("WARNING"), Some(AlertKind::Warn));
        assert_eq!(AlertKind::classify("SOMETHING_HAPPENED"), None);
    }

    #[test]
    fn test_scope_descriptor_constructors() {
        assert!(PrecedingContext::user("u-1").has_scope_id());
        assert!(PrecedingContext::device("d-1").has_scope_id());
        assert!(PrecedingContext::group("NO_ID").has_scope_id());
        assert!(!PrecedingContext::default().has_scope_id());
        // Empty-string ids do not count as scope.
        assert!(!PrecedingContext::user("").has_scope_id());
    }

    #[test]
    fn test_merged_over_override_wins() {
        let base = PrecedingContext {
            group_id: Some("base-group".into()),
            corr_id: Some(CorrelationId::new()),
            name: Some("BASE_EVENT".into()),
            ..PrecedingContext::default()
        };
        let fresh = CorrelationId::new();
        let merged = PrecedingContext::default()
            .with_corr_id(fresh)
            .merged_over(&base);

        assert_eq!(merged.corr_id, Some(fresh));
        assert_eq!(merged.group_id.as_deref(), Some("base-group"));
        assert_eq!(merged.name.as_deref(), Some("BASE_EVENT"));
    }

    #[test]
    fn test_serialized_field_names_are_screaming_snake_case() {
        let event = Event {
            id: Uuid::new_v4(),
            version: EVENT_VERSION.to_string(),
            name: "MOCK_EVENT".to_string(),
            timestamp: 1_700_000_000_000,
            is_trigger: true,
            has_alert: None,
            payload: None,
            user_id: None,
            device_id: None,
            group_id: Some("NO_ID".to_string()),
            initial_event_id: Uuid::new_v4(),
            corr_id: None,
            source_type: Some("test-service".to_string()),
            source_version: "0.1.0".to_string(),
            os: None,
            os_version: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(keys.contains(&"ID"));
        assert!(keys.contains(&"NAME"));
        assert!(keys.contains(&"IS_TRIGGER"));
        assert!(keys.contains(&"GROUP_ID"));
        assert!(keys.contains(&"INITIAL_EVENT_ID"));
        assert!(keys.contains(&"SOURCE_VERSION"));
        // Stripped: no falsy or absent fields on the wire.
        assert!(!keys.contains(&"PAYLOAD"));
        assert!(!keys.contains(&"USER_ID"));
        assert!(!keys.contains(&"HAS_ALERT"));
        assert!(!keys.contains(&"CORR_ID"));
    }

    #[test]
    fn test_false_trigger_flag_is_stripped() {
        let event = Event {
            id: Uuid::new_v4(),
            version: EVENT_VERSION.to_string(),
            name: "CHILD".to_string(),
            timestamp: 1,
            is_trigger: false,
            has_alert: None,
            payload: None,
            user_id: None,
            device_id: None,
            group_id: Some("G".to_string()),
            initial_event_id: Uuid::new_v4(),
            corr_id: None,
            source_type: None,
            source_version: "-1".to_string(),
            os: None,
            os_version: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("IS_TRIGGER").is_none());
    }

    #[test]
    fn test_as_preceding_projects_chain_position() {
        let id = Uuid::new_v4();
        let initial = Uuid::new_v4();
        let event = Event {
            id,
            version: EVENT_VERSION.to_string(),
            name: "MOCK_EVENT".to_string(),
            timestamp: 1,
            is_trigger: false,
            has_alert: None,
            payload: None,
            user_id: Some("u-1".to_string()),
            device_id: None,
            group_id: None,
            initial_event_id: initial,
            corr_id: None,
            source_type: None,
            source_version: "-1".to_string(),
            os: None,
            os_version: None,
        };

        let preceding = event.as_preceding();
        assert_eq!(preceding.id, Some(id));
        assert_eq!(preceding.initial_event_id, Some(initial));
        assert_eq!(preceding.name.as_deref(), Some("MOCK_EVENT"));
        assert_eq!(preceding.user_id.as_deref(), Some("u-1"));
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let event = Event {
            id: Uuid::new_v4(),
            version: EVENT_VERSION.to_string(),
            name: "MOCK_EVENT".to_string(),
            timestamp: 42,
            is_trigger: true,
            has_alert: Some(AlertKind::Warn),
            payload: Some(serde_json::json!({"A": "a"})),
            user_id: None,
            device_id: Some("d-9".to_string()),
            group_id: None,
            initial_event_id: Uuid::new_v4(),
            corr_id: Some(CorrelationId::new()),
            source_type: Some("svc".to_string()),
            source_version: "1.2.3".to_string(),
            os: Some("linux".to_string()),
            os_version: None,
        };

        let bytes = serde_json::to_vec(&event).unwrap();
        let back: Event = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, event);
    }
}

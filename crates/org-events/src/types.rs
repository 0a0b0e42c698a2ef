//! Event types published by the organization service
//!
//! Every mutation emits exactly one event. Events are wrapped in a generic
//! [`Event`] envelope carrying routing and ordering metadata, with the typed
//! change description in the payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Event envelope.
///
/// All published events are wrapped in this envelope, which provides
/// metadata for routing, tracing and consumer-side ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique, time-ordered id (uuid v7)
    pub id: Uuid,

    /// Event type (e.g., "organization.created")
    pub event_type: String,

    /// Publishing service name
    pub service: String,

    /// Envelope creation time
    pub timestamp: DateTime<Utc>,

    /// Organization the event concerns
    pub org_id: Option<String>,

    /// Per-organization sequence number, stamped at enqueue time.
    ///
    /// Strictly increasing for a given `org_id`, so consumers can order
    /// events without relying on delivery order or timestamps.
    #[serde(default)]
    pub sequence: u64,

    /// Serialized change description, see [`OrganizationEvent`]
    pub payload: serde_json::Value,

    /// Free-form metadata for tracing and correlation
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create an event with a fresh id and timestamp.
    ///
    /// The sequence starts at zero; the outbox stamps the real value at
    /// enqueue time.
    pub fn new(
        event_type: impl Into<String>,
        service: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            service: service.into(),
            timestamp: Utc::now(),
            org_id: None,
            sequence: 0,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set organization context.
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The subject this event publishes under: `{service}.{event_type}`.
    pub fn topic(&self) -> String {
        format!("{}.{}", self.service, self.event_type)
    }

    /// Decode the payload into a typed event.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Organization lifecycle events.
///
/// Payload snapshots carry the full document as stored, so consumers never
/// need a read back to the service to see the post-mutation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrganizationEvent {
    /// Organization was created
    Created {
        org_id: String,
        organization: serde_json::Value,
    },
    /// Organization fields were updated
    Updated {
        org_id: String,
        updated_fields: Vec<String>,
        organization: serde_json::Value,
    },
    /// Organization was deleted
    Deleted {
        org_id: String,
        name: String,
        policy: String,
    },
    /// Organization settings were updated
    SettingsUpdated {
        org_id: String,
        updated_fields: Vec<String>,
        settings: serde_json::Value,
    },
    /// Organization limits were updated
    LimitsUpdated {
        org_id: String,
        updated_fields: Vec<String>,
        limits: serde_json::Value,
    },
    /// One module was switched on
    ModuleEnabled {
        org_id: String,
        module: String,
        enabled_modules: Vec<String>,
    },
    /// One module was switched off
    ModuleDisabled {
        org_id: String,
        module: String,
        enabled_modules: Vec<String>,
    },
    /// Several modules changed in one call
    ModulesUpdated {
        org_id: String,
        added: Vec<String>,
        removed: Vec<String>,
        enabled_modules: Vec<String>,
    },
}

impl OrganizationEvent {
    /// The event type string used in topics.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrganizationEvent::Created { .. } => "organization.created",
            OrganizationEvent::Updated { .. } => "organization.updated",
            OrganizationEvent::Deleted { .. } => "organization.deleted",
            OrganizationEvent::SettingsUpdated { .. } => "organization.settings.updated",
            OrganizationEvent::LimitsUpdated { .. } => "organization.limits.updated",
            OrganizationEvent::ModuleEnabled { .. } => "organization.module.enabled",
            OrganizationEvent::ModuleDisabled { .. } => "organization.module.disabled",
            OrganizationEvent::ModulesUpdated { .. } => "organization.modules.updated",
        }
    }

    /// The organization this event concerns.
    pub fn org_id(&self) -> &str {
        match self {
            OrganizationEvent::Created { org_id, .. }
            | OrganizationEvent::Updated { org_id, .. }
            | OrganizationEvent::Deleted { org_id, .. }
            | OrganizationEvent::SettingsUpdated { org_id, .. }
            | OrganizationEvent::LimitsUpdated { org_id, .. }
            | OrganizationEvent::ModuleEnabled { org_id, .. }
            | OrganizationEvent::ModuleDisabled { org_id, .. }
            | OrganizationEvent::ModulesUpdated { org_id, .. } => org_id,
        }
    }

    /// Convert to the generic envelope.
    pub fn to_event(&self, service: &str) -> Event {
        Event::new(
            self.event_type(),
            service,
            serde_json::to_value(self).unwrap(),
        )
        .with_org(self.org_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_topic_format() {
        let event = Event::new("organization.created", "org-service", json!({}));
        assert_eq!(event.topic(), "org-service.organization.created");
    }

    #[test]
    fn test_sequence_defaults_when_absent() {
        let event = Event::new("organization.created", "org-service", json!({}));
        let mut value = serde_json::to_value(&event).unwrap();
        value.as_object_mut().unwrap().remove("sequence");

        let decoded: Event = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.sequence, 0);
    }

    #[test]
    fn test_organization_event_to_envelope() {
        let org_event = OrganizationEvent::Created {
            org_id: "org_1a2b3c4d".to_string(),
            organization: json!({"org_id": "org_1a2b3c4d", "name": "acme"}),
        };

        let event = org_event.to_event("org-service");
        assert_eq!(event.event_type, "organization.created");
        assert_eq!(event.org_id.as_deref(), Some("org_1a2b3c4d"));
        assert_eq!(event.topic(), "org-service.organization.created");
        assert_eq!(event.payload["type"], "created");
        assert_eq!(event.payload["organization"]["name"], "acme");
    }

    #[test]
    fn test_module_event_types() {
        let enabled = OrganizationEvent::ModuleEnabled {
            org_id: "org_1".to_string(),
            module: "reports".to_string(),
            enabled_modules: vec!["dashboard".to_string(), "reports".to_string()],
        };
        assert_eq!(enabled.event_type(), "organization.module.enabled");

        let bulk = OrganizationEvent::ModulesUpdated {
            org_id: "org_1".to_string(),
            added: vec!["reports".to_string()],
            removed: vec!["invoices".to_string()],
            enabled_modules: vec!["dashboard".to_string(), "reports".to_string()],
        };
        assert_eq!(bulk.event_type(), "organization.modules.updated");
    }

    #[test]
    fn test_payload_roundtrip() {
        let org_event = OrganizationEvent::Deleted {
            org_id: "org_1".to_string(),
            name: "acme".to_string(),
            policy: "cascade".to_string(),
        };

        let event = org_event.to_event("org-service");
        let decoded: OrganizationEvent = event.parse_payload().unwrap();
        assert!(matches!(decoded, OrganizationEvent::Deleted { name, .. } if name == "acme"));
    }
}

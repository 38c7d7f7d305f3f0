//! Event types.

use super::{ChannelKind, EventId, SessionId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable notification of a state change.
///
/// Events are never mutated after publication; subscribers receive shared
/// read-only references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NexusEvent {
    /// Event identifier, usable as a resumption cursor.
    pub id: EventId,

    /// Dot-separated hierarchical type name (e.g. `resource.created`).
    pub event_type: String,

    /// Channel the event originated from.
    pub source_channel: ChannelKind,

    /// Session that caused the event.
    pub session_id: SessionId,

    /// Tenant scope. Tenant-scoped events are never delivered outside
    /// their tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// JSON payload.
    pub payload: Value,

    /// Publication timestamp.
    pub timestamp: DateTime<Utc>,

    /// Delivery mode requested by the publish call.
    #[serde(default)]
    pub delivery: DeliveryMode,
}

impl NexusEvent {
    /// Create a new event with a fresh identifier and timestamp.
    pub fn new(
        event_type: impl Into<String>,
        source_channel: ChannelKind,
        session_id: SessionId,
        tenant_id: Option<TenantId>,
        payload: Value,
    ) -> Self {
        Self {
            id: EventId::generate(),
            event_type: event_type.into(),
            source_channel,
            session_id,
            tenant_id,
            payload,
            timestamp: Utc::now(),
            delivery: DeliveryMode::default(),
        }
    }

    /// Set the delivery mode.
    pub fn with_delivery(mut self, mode: DeliveryMode) -> Self {
        self.delivery = mode;
        self
    }
}

/// How a published event is delivered to each matched subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// At-least-once: a failed push is requeued once before the subscriber
    /// is considered dead.
    Persistent,

    /// Best-effort: no retry.
    #[default]
    Ephemeral,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_new() {
        let event = NexusEvent::new(
            "resource.created",
            ChannelKind::Http,
            SessionId::new("sess-1"),
            Some(TenantId::new("acme")),
            serde_json::json!({"name": "widget"}),
        );
        assert!(event.id.as_str().starts_with("evt-"));
        assert_eq!(event.event_type, "resource.created");
        assert_eq!(event.delivery, DeliveryMode::Ephemeral);
    }

    #[test]
    fn test_with_delivery() {
        let event = NexusEvent::new(
            "workflow.completed",
            ChannelKind::Tool,
            SessionId::new("sess-1"),
            None,
            Value::Null,
        )
        .with_delivery(DeliveryMode::Persistent);
        assert_eq!(event.delivery, DeliveryMode::Persistent);
    }

    #[test]
    fn test_serde_roundtrip() {
        let event = NexusEvent::new(
            "product.created",
            ChannelKind::Command,
            SessionId::new("sess-9"),
            Some(TenantId::new("globex")),
            serde_json::json!({"sku": 42}),
        );
        let json = serde_json::to_string(&event).unwrap();
        let parsed: NexusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, event.id);
        assert_eq!(parsed.event_type, event.event_type);
        assert_eq!(parsed.tenant_id, event.tenant_id);
        assert_eq!(parsed.payload, event.payload);
    }
}

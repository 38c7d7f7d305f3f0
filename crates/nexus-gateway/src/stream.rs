//! Push-stream event delivery.

use async_trait::async_trait;
use nexus_core::NexusEvent;
use nexus_events::{DeliveryError, EventSink};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event sink backed by a WebSocket connection's outbound queue.
///
/// Each delivered frame carries the event id (the client's resumption
/// cursor), the type name, and the JSON payload.
pub struct WsEventSink {
    tx: mpsc::Sender<String>,
}

impl WsEventSink {
    /// Wrap an outbound frame queue.
    pub fn new(tx: mpsc::Sender<String>) -> Arc<Self> {
        Arc::new(Self { tx })
    }
}

#[async_trait]
impl EventSink for WsEventSink {
    async fn deliver(&self, event: Arc<NexusEvent>) -> Result<(), DeliveryError> {
        let frame = event_frame(&event);
        self.tx
            .send(frame)
            .await
            .map_err(|_| DeliveryError("subscriber disconnected".to_string()))
    }
}

/// Serialize an event into its wire frame.
pub fn event_frame(event: &NexusEvent) -> String {
    serde_json::json!({
        "id": event.id,
        "type": event.event_type,
        "payload": event.payload,
        "timestamp": event.timestamp,
    })
    .to_string()
}

/// Keep-alive frame sent on idle connections. Carries no payload.
pub fn keep_alive_frame() -> String {
    serde_json::json!({ "type": "keepalive" }).to_string()
}

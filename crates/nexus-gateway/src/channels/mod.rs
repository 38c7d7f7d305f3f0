//! Channel adapters.
//!
//! Each adapter translates one entry protocol into the gateway's uniform
//! internal call and formats the result back into its own wire shape.
//! Detection runs over a fixed-priority list in a single deterministic
//! pass: explicit path-prefix matches first, then the marker header, then
//! exactly one default adapter (HTTP) for anything unclaimed.

pub mod command;
pub mod http;
pub mod tool;

use crate::context::RequestContext;
use crate::dispatch::GatewayServices;
use crate::envelope::ChannelResponse;
use async_trait::async_trait;
use nexus_core::{ChannelKind, NexusError, OperationDescriptor};
use serde_json::Value;
use std::collections::HashMap;

pub use command::CommandChannel;
pub use http::HttpChannel;
pub use tool::ToolChannel;

/// Marker header a caller may set to steer channel detection when no
/// path prefix claims the message.
pub const CHANNEL_HEADER: &str = "x-nexus-channel";

/// A transport-agnostic inbound message, before channel detection.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Request path (or command locator, e.g. `/cmd/invoke`).
    pub path: String,

    /// Header map, keys lowercased.
    pub headers: HashMap<String, String>,

    /// Parsed JSON body. `Null` when the request had no body.
    pub body: Value,
}

impl InboundMessage {
    /// Create a message.
    pub fn new(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            headers: HashMap::new(),
            body,
        }
    }

    /// Attach a header (key is lowercased).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Header lookup.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// The marker-header channel hint, if present and valid.
    pub fn channel_hint(&self) -> Option<ChannelKind> {
        self.header(CHANNEL_HEADER)?.parse().ok()
    }
}

/// A protocol-specific entry point.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// The channel this adapter serves.
    fn kind(&self) -> ChannelKind;

    /// Cheap, side-effect-free test against the message shape.
    fn detect(&self, inbound: &InboundMessage) -> bool;

    /// Translate the inbound message into the uniform internal call and
    /// format the result for this protocol.
    async fn handle(
        &self,
        ctx: &RequestContext,
        inbound: &InboundMessage,
        services: &GatewayServices,
    ) -> ChannelResponse;

    /// Static declaration of the operations this channel exposes.
    fn capabilities(&self) -> Vec<OperationDescriptor>;

    /// Format an error raised before or outside `handle` (context
    /// construction, rate limiting) in this protocol's wire shape.
    fn format_error(&self, ctx: &RequestContext, err: &NexusError) -> ChannelResponse {
        crate::envelope::failure_response(ctx, err)
    }
}

/// Pick the adapter for a message: first detector claiming it wins; the
/// marker header is consulted next; the default adapter takes the rest.
pub fn detect_channel<'a>(
    adapters: &'a [std::sync::Arc<dyn ChannelAdapter>],
    default: &'a std::sync::Arc<dyn ChannelAdapter>,
    inbound: &InboundMessage,
) -> &'a std::sync::Arc<dyn ChannelAdapter> {
    for adapter in adapters {
        if adapter.detect(inbound) {
            return adapter;
        }
    }
    if let Some(hint) = inbound.channel_hint() {
        for adapter in adapters {
            if adapter.kind() == hint {
                return adapter;
            }
        }
    }
    default
}

/// Base operations every channel exposes, used by adapters that surface
/// discovery.
pub(crate) fn core_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::new(
            "workflow.execute",
            "Execute a workflow by name",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "workflow": {"type": "string"},
                    "version": {"type": "string"},
                    "inputs": {"type": "object"},
                },
                "required": ["workflow"],
            }),
        ),
        OperationDescriptor::new(
            "workflow.list",
            "List workflows visible to the session",
            serde_json::json!({"type": "object", "properties": {}}),
        ),
        OperationDescriptor::new(
            "run.status",
            "Fetch the status of an execution run",
            serde_json::json!({
                "type": "object",
                "properties": {"run_id": {"type": "string"}},
                "required": ["run_id"],
            }),
        ),
        OperationDescriptor::new(
            "run.cancel",
            "Request cooperative cancellation of a run",
            serde_json::json!({
                "type": "object",
                "properties": {"run_id": {"type": "string"}},
                "required": ["run_id"],
            }),
        ),
        OperationDescriptor::new(
            "session.login",
            "Mint a fresh session token from principal credentials",
            serde_json::json!({"type": "object", "properties": {}}),
        ),
        OperationDescriptor::new(
            "session.whoami",
            "Describe the current session",
            serde_json::json!({"type": "object", "properties": {}}),
        ),
        OperationDescriptor::new(
            "session.revoke",
            "Revoke a session (defaults to the caller's own)",
            serde_json::json!({
                "type": "object",
                "properties": {"session_id": {"type": "string"}},
            }),
        ),
        OperationDescriptor::new(
            "event.publish",
            "Publish an event to subscribers",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "type": {"type": "string"},
                    "payload": {"type": "object"},
                    "mode": {"type": "string"},
                },
                "required": ["type"],
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_header_normalization() {
        let inbound = InboundMessage::new("/api/x", Value::Null)
            .with_header("X-Nexus-Channel", "tool");
        assert_eq!(inbound.header("x-nexus-channel"), Some("tool"));
        assert_eq!(inbound.channel_hint(), Some(ChannelKind::Tool));
    }

    #[test]
    fn test_invalid_channel_hint_ignored() {
        let inbound = InboundMessage::new("/api/x", Value::Null)
            .with_header("x-nexus-channel", "carrier-pigeon");
        assert!(inbound.channel_hint().is_none());
    }
}

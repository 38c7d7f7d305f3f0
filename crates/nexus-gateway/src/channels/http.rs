//! HTTP request/response channel adapter.
//!
//! Operations are invoked by path (`POST /api/{operation}`); the request
//! body carries the operation's `inputs` map; responses use the shared
//! envelope with protocol-appropriate status codes.

use crate::channels::{core_operations, ChannelAdapter, InboundMessage};
use crate::context::RequestContext;
use crate::dispatch::GatewayServices;
use crate::envelope::{failure_response, ChannelResponse, Envelope};
use async_trait::async_trait;
use nexus_core::{ChannelKind, NexusError, OperationDescriptor};
use serde_json::Value;

/// Path prefix this adapter claims.
pub const API_PREFIX: &str = "/api/";

/// The request/response channel. Also the gateway's single default
/// adapter: unclaimed messages land here.
#[derive(Default)]
pub struct HttpChannel;

impl HttpChannel {
    /// Create the adapter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelAdapter for HttpChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Http
    }

    fn detect(&self, inbound: &InboundMessage) -> bool {
        inbound.path.starts_with(API_PREFIX)
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        inbound: &InboundMessage,
        services: &GatewayServices,
    ) -> ChannelResponse {
        let operation = inbound
            .path
            .strip_prefix(API_PREFIX)
            .unwrap_or(&inbound.path)
            .trim_end_matches('/');
        if operation.is_empty() {
            return failure_response(
                ctx,
                &NexusError::NotFound("no operation in path".to_string()),
            );
        }

        // The body is `{ "inputs": { ... } }`; a missing map means no
        // arguments. Any other body shape is a translation error, which
        // surfaces as validation, never as a raw transport fault.
        let inputs = match inbound.body.get("inputs") {
            None => Value::Object(Default::default()),
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(_) => {
                return failure_response(
                    ctx,
                    &NexusError::Validation("'inputs' must be an object".to_string()),
                )
            }
        };

        match services.invoke(ctx, operation, &inputs).await {
            Ok(data) => ChannelResponse::ok(
                serde_json::to_value(Envelope::success(ctx, data)).unwrap_or(Value::Null),
            ),
            Err(err) => failure_response(ctx, &err),
        }
    }

    fn capabilities(&self) -> Vec<OperationDescriptor> {
        core_operations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_claims_api_paths_only() {
        let adapter = HttpChannel::new();
        assert!(adapter.detect(&InboundMessage::new("/api/workflow.execute", Value::Null)));
        assert!(!adapter.detect(&InboundMessage::new("/rpc", Value::Null)));
        assert!(!adapter.detect(&InboundMessage::new("/cmd/invoke", Value::Null)));
    }

    #[test]
    fn test_capabilities_include_execute() {
        let adapter = HttpChannel::new();
        let caps = adapter.capabilities();
        assert!(caps.iter().any(|c| c.name == "workflow.execute"));
    }
}

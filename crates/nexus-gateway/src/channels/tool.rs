//! Tool-invocation channel adapter.
//!
//! Programmatic and agent callers speak a JSON-RPC-shaped protocol at
//! `POST /rpc`: `tools/list` discovers the available tools (derived from
//! registered workflow handles), `tools/call` invokes one. Errors are
//! structured JSON-RPC error objects carrying the taxonomy kind and the
//! correlation id; responses are always HTTP 200 with the outcome in-band.

use crate::channels::{core_operations, ChannelAdapter, InboundMessage};
use crate::context::RequestContext;
use crate::dispatch::GatewayServices;
use crate::envelope::{error_body, log_failure, ChannelResponse};
use async_trait::async_trait;
use nexus_core::{ChannelKind, NexusError, OperationDescriptor};
use serde_json::Value;

/// Path prefix this adapter claims.
pub const RPC_PREFIX: &str = "/rpc";

/// The tool-invocation channel.
#[derive(Default)]
pub struct ToolChannel;

impl ToolChannel {
    /// Create the adapter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelAdapter for ToolChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Tool
    }

    fn detect(&self, inbound: &InboundMessage) -> bool {
        inbound.path == RPC_PREFIX || inbound.path.starts_with("/rpc/")
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        inbound: &InboundMessage,
        services: &GatewayServices,
    ) -> ChannelResponse {
        let id = inbound.body.get("id").cloned().unwrap_or(Value::Null);
        let Some(method) = inbound.body.get("method").and_then(Value::as_str) else {
            return rpc_error(
                ctx,
                id,
                &NexusError::Validation("missing 'method'".to_string()),
            );
        };
        let params = inbound.body.get("params").cloned().unwrap_or(Value::Null);

        let result = match method {
            "tools/list" => self.tools_list(ctx, services).await,
            "tools/call" => self.tools_call(ctx, &params, services).await,
            other => Err(NexusError::NotFound(format!("method '{other}'"))),
        };

        match result {
            Ok(value) => ChannelResponse::ok(serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": value,
            })),
            Err(err) => rpc_error(ctx, id, &err),
        }
    }

    fn capabilities(&self) -> Vec<OperationDescriptor> {
        core_operations()
    }

    fn format_error(&self, ctx: &RequestContext, err: &NexusError) -> ChannelResponse {
        rpc_error(ctx, Value::Null, err)
    }
}

impl ToolChannel {
    /// Discovery: tool name, description, and input schema, derived from
    /// the registered workflow handles visible to the session.
    async fn tools_list(
        &self,
        ctx: &RequestContext,
        services: &GatewayServices,
    ) -> Result<Value, NexusError> {
        let listing = services.invoke(ctx, "workflow.list", &Value::Null).await?;
        let tools: Vec<Value> = listing["workflows"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|w| {
                serde_json::json!({
                    "name": w["name"],
                    "description": w["description"],
                    "input_schema": w["input_schema"],
                })
            })
            .collect();
        Ok(serde_json::json!({ "tools": tools }))
    }

    async fn tools_call(
        &self,
        ctx: &RequestContext,
        params: &Value,
        services: &GatewayServices,
    ) -> Result<Value, NexusError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| NexusError::Validation("missing tool 'name'".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let inputs = serde_json::json!({
            "workflow": name,
            "inputs": arguments,
        });
        services.invoke(ctx, "workflow.execute", &inputs).await
    }
}

/// JSON-RPC error codes for the taxonomy.
fn rpc_code(err: &NexusError) -> i32 {
    match err {
        NexusError::Validation(_) => -32602,
        NexusError::NotFound(_) => -32601,
        NexusError::Authentication(_) => -32001,
        NexusError::Authorization { .. } => -32002,
        NexusError::RateLimit { .. } => -32003,
        NexusError::Execution { .. } => -32004,
        NexusError::Internal(_) | NexusError::Config(_) => -32603,
    }
}

fn rpc_error(ctx: &RequestContext, id: Value, err: &NexusError) -> ChannelResponse {
    log_failure(ctx, err);
    let body = error_body(err);
    ChannelResponse::ok(serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": rpc_code(err),
            "message": body.message,
            "data": {
                "kind": body.kind,
                "request_id": ctx.request_id,
                "retry_after_ms": body.retry_after_ms,
            },
        },
    }))
}

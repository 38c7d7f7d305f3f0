//! Command channel adapter.
//!
//! Commands arrive as `POST /cmd/{command}` with a body of named options
//! that map 1:1 onto the uniform inputs map. Events for this channel are
//! queued for polling (`subscribe` / `poll`) instead of being pushed,
//! since a command-line caller has no long-lived connection.

use crate::channels::{core_operations, ChannelAdapter, InboundMessage};
use crate::context::RequestContext;
use crate::dispatch::GatewayServices;
use crate::envelope::{failure_response, ChannelResponse, Envelope};
use async_trait::async_trait;
use dashmap::DashMap;
use nexus_core::{ChannelKind, NexusError, NexusEvent, OperationDescriptor, SubscriptionId};
use nexus_events::{DeliveryError, EventSink};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// Path prefix this adapter claims.
pub const CMD_PREFIX: &str = "/cmd/";

/// Events buffered per poll subscription before the oldest are dropped.
const POLL_BUFFER_CAPACITY: usize = 256;

/// The command channel.
#[derive(Default)]
pub struct CommandChannel {
    buffers: DashMap<SubscriptionId, Arc<PollBuffer>>,
}

impl CommandChannel {
    /// Create the adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Queued event sink for poll-based delivery.
struct PollBuffer {
    events: Mutex<VecDeque<Arc<NexusEvent>>>,
}

impl PollBuffer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(VecDeque::new()),
        })
    }

    fn drain(&self) -> Vec<Arc<NexusEvent>> {
        self.events.lock().drain(..).collect()
    }
}

#[async_trait]
impl EventSink for PollBuffer {
    async fn deliver(&self, event: Arc<NexusEvent>) -> Result<(), DeliveryError> {
        let mut events = self.events.lock();
        if events.len() >= POLL_BUFFER_CAPACITY {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for CommandChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Command
    }

    fn detect(&self, inbound: &InboundMessage) -> bool {
        inbound.path.starts_with(CMD_PREFIX) || inbound.path == "/cmd"
    }

    async fn handle(
        &self,
        ctx: &RequestContext,
        inbound: &InboundMessage,
        services: &GatewayServices,
    ) -> ChannelResponse {
        let command = inbound
            .path
            .strip_prefix(CMD_PREFIX)
            .unwrap_or("")
            .trim_end_matches('/');

        let options = match inbound.body.get("options") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return failure_response(
                    ctx,
                    &NexusError::Validation("'options' must be an object".to_string()),
                )
            }
        };

        let result = match command {
            "subscribe" => self.subscribe(ctx, &options, services).await,
            "poll" => self.poll(&options),
            "unsubscribe" => self.unsubscribe(&options, services),
            other => match translate(other, options) {
                Ok((operation, inputs)) => services.invoke(ctx, operation, &inputs).await,
                Err(err) => Err(err),
            },
        };

        match result {
            Ok(data) => ChannelResponse::ok(
                serde_json::to_value(Envelope::success(ctx, data)).unwrap_or(Value::Null),
            ),
            Err(err) => failure_response(ctx, &err),
        }
    }

    fn capabilities(&self) -> Vec<OperationDescriptor> {
        let mut caps = core_operations();
        caps.push(OperationDescriptor::new(
            "event.subscribe",
            "Register a poll-based event subscription",
            serde_json::json!({
                "type": "object",
                "properties": {"pattern": {"type": "string"}},
                "required": ["pattern"],
            }),
        ));
        caps.push(OperationDescriptor::new(
            "event.poll",
            "Drain queued events for a subscription",
            serde_json::json!({
                "type": "object",
                "properties": {"subscription_id": {"type": "string"}},
                "required": ["subscription_id"],
            }),
        ));
        caps
    }
}

impl CommandChannel {
    async fn subscribe(
        &self,
        ctx: &RequestContext,
        options: &Map<String, Value>,
        services: &GatewayServices,
    ) -> Result<Value, NexusError> {
        let pattern = options
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| NexusError::Validation("missing required option 'pattern'".to_string()))?;

        services
            .security
            .authorize(
                &ctx.session,
                &format!("event:{pattern}"),
                "subscribe",
                ctx.channel,
                &ctx.request_id,
            )
            .await?;

        let buffer = PollBuffer::new();
        let id = services.events.subscribe(
            buffer.clone(),
            pattern,
            ctx.session.tenant_id.clone(),
        )?;
        self.buffers.insert(id.clone(), buffer);
        Ok(serde_json::json!({ "subscription_id": id }))
    }

    fn poll(&self, options: &Map<String, Value>) -> Result<Value, NexusError> {
        let id = options
            .get("subscription_id")
            .and_then(Value::as_str)
            .map(SubscriptionId::new)
            .ok_or_else(|| {
                NexusError::Validation("missing required option 'subscription_id'".to_string())
            })?;

        let buffer = self
            .buffers
            .get(&id)
            .ok_or_else(|| NexusError::NotFound(format!("subscription '{id}'")))?;
        let events: Vec<Value> = buffer
            .drain()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "id": e.id,
                    "type": e.event_type,
                    "payload": e.payload,
                    "timestamp": e.timestamp,
                })
            })
            .collect();
        Ok(serde_json::json!({ "events": events }))
    }

    fn unsubscribe(
        &self,
        options: &Map<String, Value>,
        services: &GatewayServices,
    ) -> Result<Value, NexusError> {
        let id = options
            .get("subscription_id")
            .and_then(Value::as_str)
            .map(SubscriptionId::new)
            .ok_or_else(|| {
                NexusError::Validation("missing required option 'subscription_id'".to_string())
            })?;

        let removed = services.events.unsubscribe(&id);
        self.buffers.remove(&id);
        Ok(serde_json::json!({ "unsubscribed": removed }))
    }
}

/// Translate a command plus named options into the uniform internal call.
fn translate(command: &str, mut options: Map<String, Value>) -> Result<(&'static str, Value), NexusError> {
    match command {
        "invoke" => {
            let workflow = options.remove("workflow").ok_or_else(|| {
                NexusError::Validation("missing required option 'workflow'".to_string())
            })?;
            let version = options.remove("version");
            // Every remaining named option maps 1:1 onto the workflow's
            // inputs map.
            let mut inputs = Map::new();
            inputs.insert("workflow".to_string(), workflow);
            if let Some(version) = version {
                inputs.insert("version".to_string(), version);
            }
            inputs.insert("inputs".to_string(), Value::Object(options));
            Ok(("workflow.execute", Value::Object(inputs)))
        }
        "workflows" => Ok(("workflow.list", Value::Object(Map::new()))),
        "status" => Ok(("run.status", Value::Object(options))),
        "cancel" => Ok(("run.cancel", Value::Object(options))),
        "login" => Ok(("session.login", Value::Object(Map::new()))),
        "whoami" => Ok(("session.whoami", Value::Object(Map::new()))),
        "revoke" => Ok(("session.revoke", Value::Object(options))),
        "publish" => Ok(("event.publish", Value::Object(options))),
        other => Err(NexusError::NotFound(format!("command '{other}'"))),
    }
}

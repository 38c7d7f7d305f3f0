//! Gateway core: shared services, the uniform internal call, and
//! top-level dispatch.

use crate::channels::{
    detect_channel, ChannelAdapter, CommandChannel, HttpChannel, InboundMessage, ToolChannel,
};
use crate::context::RequestContext;
use crate::envelope::ChannelResponse;
use nexus_core::{
    ChannelKind, Config, DeliveryMode, ExecutionRun, NexusError, NexusEvent, Result, RunId,
    Session,
};
use nexus_events::EventRouter;
use nexus_security::{Credentials, SecurityManager};
use nexus_sessions::SessionStore;
use nexus_workflows::WorkflowExecutor;
use semver::Version;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// The components every channel adapter shares.
pub struct GatewayServices {
    /// Session store.
    pub sessions: Arc<SessionStore>,

    /// Security manager.
    pub security: Arc<SecurityManager>,

    /// Workflow executor.
    pub executor: Arc<WorkflowExecutor>,

    /// Event router.
    pub events: Arc<EventRouter>,

    /// Gateway configuration.
    pub config: Config,
}

impl GatewayServices {
    /// Execute the uniform internal call: every channel adapter reduces
    /// its protocol to (operation name, inputs map) and lands here.
    pub async fn invoke(
        &self,
        ctx: &RequestContext,
        operation: &str,
        inputs: &Value,
    ) -> Result<Value> {
        debug!(request_id = %ctx.request_id, channel = %ctx.channel, operation, "invoke");
        match operation {
            "workflow.execute" => self.workflow_execute(ctx, inputs).await,
            "workflow.list" => self.workflow_list(ctx).await,
            "run.status" => self.run_status(ctx, inputs).await,
            "run.cancel" => self.run_cancel(ctx, inputs).await,
            "session.login" => self.session_login(ctx).await,
            "session.whoami" => self.session_whoami(ctx).await,
            "session.revoke" => self.session_revoke(ctx, inputs).await,
            "event.publish" => self.event_publish(ctx, inputs).await,
            other => Err(NexusError::NotFound(format!("operation '{other}'"))),
        }
    }

    async fn workflow_execute(&self, ctx: &RequestContext, inputs: &Value) -> Result<Value> {
        let workflow = require_str(inputs, "workflow")?;
        let version = match inputs.get("version").and_then(Value::as_str) {
            Some(raw) => Some(Version::parse(raw).map_err(|e| {
                NexusError::Validation(format!("invalid version '{raw}': {e}"))
            })?),
            None => None,
        };
        let body = inputs.get("inputs").cloned().unwrap_or(Value::Null);

        let handle = self
            .executor
            .resolve(&workflow.into(), version.as_ref())?;
        let validated = self.executor.validate(&handle, &body)?;
        let run = self
            .executor
            .execute(&handle, validated, &ctx.session, ctx.channel, &ctx.request_id)
            .await?;

        // Synchronous-style callers get a bounded wait; if the budget
        // elapses first they fall back to polling by run id.
        let run = self
            .executor
            .wait_for_terminal(&run.run_id, self.executor.wait_budget())
            .await?;
        run_to_value(&run)
    }

    async fn workflow_list(&self, ctx: &RequestContext) -> Result<Value> {
        self.security
            .authorize(
                &ctx.session,
                "workflow:catalog",
                "list",
                ctx.channel,
                &ctx.request_id,
            )
            .await?;

        let workflows: Vec<Value> = self
            .executor
            .registry()
            .list(ctx.session.tenant_id.as_ref())
            .into_iter()
            .map(|handle| {
                serde_json::json!({
                    "name": handle.id,
                    "version": handle.version.to_string(),
                    "description": handle.description,
                    "input_schema": handle.input_schema.to_json_schema(),
                    "required_permission": handle.required_permission,
                })
            })
            .collect();
        Ok(serde_json::json!({ "workflows": workflows }))
    }

    async fn run_status(&self, ctx: &RequestContext, inputs: &Value) -> Result<Value> {
        let run_id = RunId::new(require_str(inputs, "run_id")?);
        let run = self.executor.get_run(&run_id).await?;

        self.security
            .enforce_tenant_isolation(
                &ctx.session,
                run.tenant_id.as_ref(),
                &format!("run:{run_id}"),
                ctx.channel,
                &ctx.request_id,
            )
            .await?;
        self.security
            .authorize(
                &ctx.session,
                &format!("run:{run_id}"),
                "status",
                ctx.channel,
                &ctx.request_id,
            )
            .await?;
        run_to_value(&run)
    }

    async fn run_cancel(&self, ctx: &RequestContext, inputs: &Value) -> Result<Value> {
        let run_id = RunId::new(require_str(inputs, "run_id")?);
        let run = self
            .executor
            .cancel(&run_id, &ctx.session, ctx.channel, &ctx.request_id)
            .await?;
        run_to_value(&run)
    }

    async fn session_login(&self, ctx: &RequestContext) -> Result<Value> {
        let token = ctx.token.as_deref().ok_or_else(|| {
            NexusError::Authentication("login requires principal credentials".to_string())
        })?;
        let (session, session_token) = self
            .security
            .login(Credentials::Bearer(token), ctx.channel)
            .await?;
        Ok(serde_json::json!({
            "session_id": session.id,
            "token": session_token,
            "user_id": session.user_id,
            "tenant_id": session.tenant_id,
            "expires_at": session.expires_at,
        }))
    }

    async fn session_whoami(&self, ctx: &RequestContext) -> Result<Value> {
        self.security
            .authorize(
                &ctx.session,
                &format!("session:{}", ctx.session.id),
                "whoami",
                ctx.channel,
                &ctx.request_id,
            )
            .await?;
        let session = self.sessions.get(&ctx.session.id).await?;
        Ok(serde_json::json!({
            "session_id": session.id,
            "user_id": session.user_id,
            "tenant_id": session.tenant_id,
            "channels": session.channels,
            "created_at": session.created_at,
            "expires_at": session.expires_at,
            "version": session.version,
            "metadata": session.metadata,
        }))
    }

    async fn session_revoke(&self, ctx: &RequestContext, inputs: &Value) -> Result<Value> {
        // Defaults to the caller's own session.
        let target = inputs
            .get("session_id")
            .and_then(Value::as_str)
            .map(nexus_core::SessionId::new)
            .unwrap_or_else(|| ctx.session.id.clone());
        let session = self.sessions.get(&target).await?;

        let resource = format!("session:{target}");
        self.security
            .enforce_tenant_isolation(
                &ctx.session,
                session.tenant_id.as_ref(),
                &resource,
                ctx.channel,
                &ctx.request_id,
            )
            .await?;
        self.security
            .authorize(&ctx.session, &resource, "revoke", ctx.channel, &ctx.request_id)
            .await?;

        let revoked = self.sessions.revoke(&target).await?;
        Ok(serde_json::json!({
            "session_id": target,
            "revoked": revoked,
        }))
    }

    async fn event_publish(&self, ctx: &RequestContext, inputs: &Value) -> Result<Value> {
        let event_type = require_str(inputs, "type")?;
        let payload = inputs.get("payload").cloned().unwrap_or(Value::Null);
        let mode = match inputs.get("mode").and_then(Value::as_str) {
            Some("persistent") => DeliveryMode::Persistent,
            Some("ephemeral") | None => DeliveryMode::Ephemeral,
            Some(other) => {
                return Err(NexusError::Validation(format!(
                    "unknown delivery mode '{other}'"
                )))
            }
        };

        self.security
            .authorize(
                &ctx.session,
                &format!("event:{event_type}"),
                "publish",
                ctx.channel,
                &ctx.request_id,
            )
            .await?;

        let event = NexusEvent::new(
            event_type,
            ctx.channel,
            ctx.session.id.clone(),
            ctx.session.tenant_id.clone(),
            payload,
        );
        let event_id = event.id.clone();
        let receipt = self.events.publish(event, mode).await;
        Ok(serde_json::json!({
            "event_id": event_id,
            "matched": receipt.matched,
            "mode": match receipt.mode {
                DeliveryMode::Persistent => "persistent",
                DeliveryMode::Ephemeral => "ephemeral",
            },
        }))
    }
}

/// Serialize a run for channel responses.
pub fn run_to_value(run: &ExecutionRun) -> Result<Value> {
    Ok(serde_json::to_value(run)?)
}

fn require_str<'a>(inputs: &'a Value, key: &str) -> Result<&'a str> {
    inputs
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| NexusError::Validation(format!("missing required input '{key}'")))
}

/// Top-level dispatch: channel detection, context construction, adapter
/// hand-off.
pub struct Dispatcher {
    services: Arc<GatewayServices>,
    adapters: Vec<Arc<dyn ChannelAdapter>>,
    default: Arc<dyn ChannelAdapter>,
}

impl Dispatcher {
    /// Build the dispatcher with the fixed-priority adapter list:
    /// command prefix, then tool prefix, then the HTTP default.
    pub fn new(services: Arc<GatewayServices>) -> Self {
        let adapters: Vec<Arc<dyn ChannelAdapter>> = vec![
            Arc::new(CommandChannel::new()),
            Arc::new(ToolChannel::new()),
        ];
        Self {
            services,
            adapters,
            default: Arc::new(HttpChannel::new()),
        }
    }

    /// Shared services.
    pub fn services(&self) -> &Arc<GatewayServices> {
        &self.services
    }

    /// Per-channel operation declarations, for discovery.
    pub fn capabilities(&self) -> Value {
        let mut channels = serde_json::Map::new();
        for adapter in self.adapters.iter().chain(std::iter::once(&self.default)) {
            let operations: Vec<Value> = adapter
                .capabilities()
                .into_iter()
                .map(|op| {
                    serde_json::json!({
                        "name": op.name,
                        "description": op.description,
                        "input_schema": op.input_schema,
                    })
                })
                .collect();
            channels.insert(
                adapter.kind().to_string(),
                Value::Array(operations),
            );
        }
        Value::Object(channels)
    }

    /// Handle one inbound message end to end.
    pub async fn dispatch(&self, inbound: InboundMessage) -> ChannelResponse {
        let adapter = detect_channel(&self.adapters, &self.default, &inbound);
        let channel = adapter.kind();

        match self.build_context(&inbound, channel).await {
            Ok(ctx) => adapter.handle(&ctx, &inbound, &self.services).await,
            Err(err) => {
                // No session could be established; format with a
                // placeholder context so the correlation id still exists.
                let ctx = RequestContext::new(
                    channel,
                    Session::anonymous(channel, chrono::Duration::zero()),
                    None,
                );
                adapter.format_error(&ctx, &err)
            }
        }
    }

    /// Resolve credentials into a session, apply the rate limit, and
    /// assemble the request context.
    async fn build_context(
        &self,
        inbound: &InboundMessage,
        channel: ChannelKind,
    ) -> Result<RequestContext> {
        let token = bearer_token(inbound);

        let session = if let Some(token) = token.as_deref() {
            self.services
                .security
                .authenticate(Credentials::Bearer(token), channel)
                .await?
        } else if let (Some(key_id), Some(signature)) = (
            inbound.header("x-nexus-key-id"),
            inbound.header("x-nexus-signature"),
        ) {
            let body = serde_json::to_string(&inbound.body)?;
            self.services
                .security
                .authenticate(
                    Credentials::Signed {
                        key_id,
                        signature,
                        body: &body,
                    },
                    channel,
                )
                .await?
        } else if self.services.config.gateway.require_auth {
            return Err(NexusError::Authentication(
                "credentials required".to_string(),
            ));
        } else {
            let (session, _token) = self.services.sessions.anonymous(channel).await?;
            session
        };

        self.services.security.rate_limit(&session, channel)?;
        Ok(RequestContext::new(channel, session, token))
    }
}

fn bearer_token(inbound: &InboundMessage) -> Option<String> {
    if let Some(auth) = inbound.header("authorization") {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }
    inbound.header("x-nexus-token").map(str::to_string)
}

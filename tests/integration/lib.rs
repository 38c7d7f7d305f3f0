//! Shared fixtures for the integration tests.
//!
//! All scenarios run against an in-process gateway: messages go through
//! the real dispatcher (channel detection, context construction, security,
//! execution) without a network socket in between.

use nexus_core::config::{PrincipalConfig, SecurityConfig};
use nexus_core::{id, Config, FieldSpec, FieldType, InputSchema, TenantId, WorkflowHandle};
use nexus_gateway::{ChannelResponse, Gateway, InboundMessage};
use nexus_workflows::EchoRuntime;
use semver::Version;
use std::sync::Arc;

/// Token for `alice`, an operator in tenant `acme`.
pub const ALICE_TOKEN: &str = "alice-token";

/// Token for `gomez`, an operator in tenant `globex`.
pub const GOMEZ_TOKEN: &str = "gomez-token";

/// Build the test configuration: two tenants, one operator each.
pub fn test_config() -> Config {
    let mut security = SecurityConfig::default();
    security.roles.insert(
        "operator".to_string(),
        vec![
            "workflow:execute".to_string(),
            "run:cancel".to_string(),
            "session:revoke".to_string(),
            "event:*".to_string(),
        ],
    );
    security.principals.insert(
        "alice".to_string(),
        PrincipalConfig {
            user_id: "alice".to_string(),
            tenant: Some("acme".to_string()),
            roles: vec!["operator".to_string()],
            token_sha256: Some(id::sha256(ALICE_TOKEN)),
            signing_key: Some("alice-secret".to_string()),
        },
    );
    security.principals.insert(
        "gomez".to_string(),
        PrincipalConfig {
            user_id: "gomez".to_string(),
            tenant: Some("globex".to_string()),
            roles: vec!["operator".to_string()],
            token_sha256: Some(id::sha256(GOMEZ_TOKEN)),
            signing_key: None,
        },
    );

    let mut config = Config::default();
    config.security = security;
    config
}

/// The echo workflow, visible to every tenant.
pub fn echo_workflow() -> WorkflowHandle {
    let schema = InputSchema::empty()
        .field(FieldSpec::required("message", FieldType::String))
        .field(FieldSpec::optional("delay_ms", FieldType::Integer));
    WorkflowHandle::new("echo", Version::new(1, 0, 0), schema, "workflow:execute")
        .with_description("Echo the message back")
}

/// Workflow `w1`, registered by tenant `acme`.
pub fn acme_workflow() -> WorkflowHandle {
    WorkflowHandle::new(
        "w1",
        Version::new(1, 0, 0),
        InputSchema::empty(),
        "workflow:execute",
    )
    .with_tenant(TenantId::new("acme"))
}

/// An in-process gateway with the test config and workflows registered.
pub fn test_gateway() -> Gateway {
    test_gateway_with_store().0
}

/// Same as [`test_gateway`], keeping a handle on the backing store so
/// tests can inspect the audit trail.
pub fn test_gateway_with_store() -> (Gateway, Arc<nexus_store::MemoryStore>) {
    let store = Arc::new(nexus_store::MemoryStore::new());
    let gateway = Gateway::with_stores(
        test_config(),
        Arc::new(EchoRuntime::new()),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    gateway.registry().register(echo_workflow()).unwrap();
    gateway.registry().register(acme_workflow()).unwrap();
    (gateway, store)
}

/// Dispatch a message through the gateway.
pub async fn dispatch(gateway: &Gateway, inbound: InboundMessage) -> ChannelResponse {
    gateway.dispatcher().dispatch(inbound).await
}

/// HTTP-channel request: `POST /api/{operation}` with an inputs map.
pub fn api(operation: &str, inputs: serde_json::Value, token: Option<&str>) -> InboundMessage {
    let mut message = InboundMessage::new(
        format!("/api/{operation}"),
        serde_json::json!({ "inputs": inputs }),
    );
    if let Some(token) = token {
        message = message.with_header("authorization", format!("Bearer {token}"));
    }
    message
}

/// Command-channel request: `POST /cmd/{command}` with named options.
pub fn cmd(command: &str, options: serde_json::Value, token: Option<&str>) -> InboundMessage {
    let mut message = InboundMessage::new(
        format!("/cmd/{command}"),
        serde_json::json!({ "options": options }),
    );
    if let Some(token) = token {
        message = message.with_header("authorization", format!("Bearer {token}"));
    }
    message
}

/// Tool-channel request: `POST /rpc` with a JSON-RPC body.
pub fn rpc(method: &str, params: serde_json::Value, token: Option<&str>) -> InboundMessage {
    let mut message = InboundMessage::new(
        "/rpc",
        serde_json::json!({ "id": 1, "method": method, "params": params }),
    );
    if let Some(token) = token {
        message = message.with_header("authorization", format!("Bearer {token}"));
    }
    message
}

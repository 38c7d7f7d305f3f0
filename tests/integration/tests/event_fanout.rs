//! Event fan-out across channels and tenants.

use async_trait::async_trait;
use nexus_core::NexusEvent;
use nexus_core::TenantId;
use nexus_events::{DeliveryError, EventSink};
use nexus_integration_tests::{api, cmd, dispatch, test_gateway, ALICE_TOKEN, GOMEZ_TOKEN};
use parking_lot::Mutex;
use std::sync::Arc;

struct CollectingSink {
    seen: Mutex<Vec<String>>,
}

impl CollectingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn types(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn deliver(&self, event: Arc<NexusEvent>) -> Result<(), DeliveryError> {
        self.seen.lock().push(event.event_type.clone());
        Ok(())
    }
}

async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
}

/// Scenario: publish `product.created` tagged tenant `acme`. A
/// `product.*` subscriber under `acme` receives it exactly once; the same
/// pattern under `globex` receives nothing.
#[tokio::test]
async fn tenant_scoped_fanout() {
    let gateway = test_gateway();
    let events = &gateway.services().events;

    let acme = CollectingSink::new();
    let globex = CollectingSink::new();
    events
        .subscribe(acme.clone(), "product.*", Some(TenantId::new("acme")))
        .unwrap();
    events
        .subscribe(globex.clone(), "product.*", Some(TenantId::new("globex")))
        .unwrap();

    // Publish through the HTTP channel as alice (tenant acme).
    let response = dispatch(
        &gateway,
        api(
            "event.publish",
            serde_json::json!({"type": "product.created", "payload": {"sku": 1}}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert_eq!(response.body["success"], true, "{:?}", response.body);
    assert_eq!(response.body["data"]["matched"], 1);

    settle().await;
    assert_eq!(acme.types(), vec!["product.created".to_string()]);
    assert!(globex.types().is_empty());
}

/// Workflow lifecycle events reach subscribers in publish order, exactly
/// once per subscriber.
#[tokio::test]
async fn lifecycle_events_in_order() {
    let gateway = test_gateway();

    let sink = CollectingSink::new();
    gateway
        .services()
        .events
        .subscribe(sink.clone(), "workflow.*", Some(TenantId::new("acme")))
        .unwrap();

    let response = dispatch(
        &gateway,
        api(
            "workflow.execute",
            serde_json::json!({"workflow": "echo", "inputs": {"message": "hi"}}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert_eq!(response.body["data"]["status"], "completed");

    settle().await;
    assert_eq!(
        sink.types(),
        vec![
            "workflow.started".to_string(),
            "workflow.completed".to_string()
        ]
    );
}

/// The command channel's queued-poll subscription delivers the same
/// events a push subscriber would see.
#[tokio::test]
async fn command_channel_poll_subscription() {
    let gateway = test_gateway();

    let sub = dispatch(
        &gateway,
        cmd(
            "subscribe",
            serde_json::json!({"pattern": "product.*"}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert_eq!(sub.body["success"], true, "{:?}", sub.body);
    let subscription_id = sub.body["data"]["subscription_id"]
        .as_str()
        .unwrap()
        .to_string();

    dispatch(
        &gateway,
        api(
            "event.publish",
            serde_json::json!({"type": "product.created", "payload": {"sku": 2}}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    settle().await;

    let polled = dispatch(
        &gateway,
        cmd(
            "poll",
            serde_json::json!({"subscription_id": subscription_id}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    let events = polled.body["data"]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "product.created");
    assert_eq!(events[0]["payload"]["sku"], 2);
    assert!(events[0]["id"].as_str().unwrap().starts_with("evt-"));

    // A second poll drains nothing: exactly-once per subscriber.
    let again = dispatch(
        &gateway,
        cmd(
            "poll",
            serde_json::json!({"subscription_id": subscription_id}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert!(again.body["data"]["events"].as_array().unwrap().is_empty());
}

/// Publishing from one tenant never reaches another tenant's poll
/// subscription, regardless of pattern.
#[tokio::test]
async fn poll_subscription_is_tenant_scoped() {
    let gateway = test_gateway();

    let sub = dispatch(
        &gateway,
        cmd(
            "subscribe",
            serde_json::json!({"pattern": "product.*"}),
            Some(GOMEZ_TOKEN),
        ),
    )
    .await;
    let subscription_id = sub.body["data"]["subscription_id"]
        .as_str()
        .unwrap()
        .to_string();

    dispatch(
        &gateway,
        api(
            "event.publish",
            serde_json::json!({"type": "product.created"}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    settle().await;

    let polled = dispatch(
        &gateway,
        cmd(
            "poll",
            serde_json::json!({"subscription_id": subscription_id}),
            Some(GOMEZ_TOKEN),
        ),
    )
    .await;
    assert!(polled.body["data"]["events"].as_array().unwrap().is_empty());
}

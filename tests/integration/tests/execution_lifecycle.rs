//! Execution lifecycle: long-running runs, cancellation, wait budgets,
//! and rate limiting.

use nexus_core::Config;
use nexus_gateway::Gateway;
use nexus_integration_tests::{
    acme_workflow, api, cmd, dispatch, echo_workflow, test_config, test_gateway, ALICE_TOKEN,
};
use nexus_workflows::EchoRuntime;
use std::sync::Arc;

fn gateway_with(config: Config) -> Gateway {
    let gateway = Gateway::in_memory(config, Arc::new(EchoRuntime::new()));
    gateway.registry().register(echo_workflow()).unwrap();
    gateway.registry().register(acme_workflow()).unwrap();
    gateway
}

/// Scenario: start a long-running workflow, capture its run id, request
/// cancellation. The run reaches `cancelled` (runtime acknowledged) and
/// never silently disappears without a terminal status.
#[tokio::test]
async fn cancel_long_running_workflow() {
    let mut config = test_config();
    // Do not wait for the long run inside the execute call.
    config.executor.wait_budget_ms = 100;
    let gateway = gateway_with(config);

    let started = dispatch(
        &gateway,
        api(
            "workflow.execute",
            serde_json::json!({"workflow": "echo", "inputs": {"message": "x", "delay_ms": 5000}}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert_eq!(started.body["success"], true, "{:?}", started.body);
    let run_id = started.body["data"]["run_id"].as_str().unwrap().to_string();
    // The wait budget elapsed before the run finished; the caller got the
    // run id for asynchronous polling instead.
    let status = started.body["data"]["status"].as_str().unwrap();
    assert!(status == "queued" || status == "running");

    // Give the driver time to reach running, then cancel via the command
    // channel.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let cancelled = dispatch(
        &gateway,
        cmd(
            "cancel",
            serde_json::json!({"run_id": run_id}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert_eq!(cancelled.body["data"]["status"], "cancelled");

    // The terminal status sticks.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let final_status = dispatch(
        &gateway,
        cmd(
            "status",
            serde_json::json!({"run_id": run_id}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert_eq!(final_status.body["data"]["status"], "cancelled");
}

/// A run that outlives the wait budget completes on its own and is
/// observable by run id afterwards.
#[tokio::test]
async fn wait_budget_falls_back_to_polling() {
    let mut config = test_config();
    config.executor.wait_budget_ms = 50;
    let gateway = gateway_with(config);

    let started = dispatch(
        &gateway,
        api(
            "workflow.execute",
            serde_json::json!({"workflow": "echo", "inputs": {"message": "slow", "delay_ms": 400}}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    let run_id = started.body["data"]["run_id"].as_str().unwrap().to_string();
    assert_ne!(started.body["data"]["status"], "completed");

    // Poll until terminal.
    let mut last = serde_json::Value::Null;
    for _ in 0..40 {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let status = dispatch(
            &gateway,
            api(
                "run.status",
                serde_json::json!({"run_id": run_id}),
                Some(ALICE_TOKEN),
            ),
        )
        .await;
        last = status.body["data"].clone();
        if last["status"] == "completed" {
            break;
        }
    }
    assert_eq!(last["status"], "completed");
    assert_eq!(last["result"]["echo"], "slow");
}

/// Rate limiting: with a limit of N per window, the (N+1)th request is
/// rejected with a backoff hint, and a fresh window admits requests
/// again.
#[tokio::test]
async fn rate_limit_window() {
    let mut config = test_config();
    config.security.rate_limit.max_requests = 3;
    config.security.rate_limit.window_secs = 1;
    let gateway = gateway_with(config);

    for _ in 0..3 {
        let ok = dispatch(
            &gateway,
            api("session.whoami", serde_json::json!({}), Some(ALICE_TOKEN)),
        )
        .await;
        assert_eq!(ok.status, 200);
    }

    let limited = dispatch(
        &gateway,
        api("session.whoami", serde_json::json!({}), Some(ALICE_TOKEN)),
    )
    .await;
    assert_eq!(limited.status, 429);
    assert_eq!(limited.body["error"]["kind"], "rate_limit");
    assert!(limited.body["error"]["retry_after_ms"].as_u64().unwrap() > 0);

    // After the window elapses the same session is admitted again.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let admitted = dispatch(
        &gateway,
        api("session.whoami", serde_json::json!({}), Some(ALICE_TOKEN)),
    )
    .await;
    assert_eq!(admitted.status, 200);
}

/// Unknown run ids are `not_found` on every channel.
#[tokio::test]
async fn unknown_run_is_not_found() {
    let gateway = test_gateway();

    let response = dispatch(
        &gateway,
        api(
            "run.status",
            serde_json::json!({"run_id": "run-ghost"}),
            Some(ALICE_TOKEN),
        ),
    )
    .await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body["error"]["kind"], "not_found");
}

/// Idempotence: re-invoking the same workflow with the same inputs and
/// session yields distinct runs with reproducible results.
#[tokio::test]
async fn repeat_invocations_are_reproducible() {
    let gateway = test_gateway();

    let mut run_ids = Vec::new();
    for _ in 0..2 {
        let response = dispatch(
            &gateway,
            api(
                "workflow.execute",
                serde_json::json!({"workflow": "echo", "inputs": {"message": "same"}}),
                Some(ALICE_TOKEN),
            ),
        )
        .await;
        assert_eq!(response.body["data"]["result"]["echo"], "same");
        run_ids.push(response.body["data"]["run_id"].as_str().unwrap().to_string());
    }
    assert_ne!(run_ids[0], run_ids[1], "run ids are globally unique");
}

//! Cross-channel session equivalence.
//!
//! A session created via one channel must resolve identically from every
//! other channel presenting the same token.

use nexus_integration_tests::{api, cmd, dispatch, rpc, test_gateway, ALICE_TOKEN};

/// Scenario: create a session for `alice` via the request/response
/// protocol, invoke `echo`, then present the same session token via the
/// command protocol and invoke `echo` again. Both invocations must return
/// the identical result and reference the same session.
#[tokio::test]
async fn echo_via_two_channels_shares_one_session() {
    let gateway = test_gateway();

    // Login over the HTTP channel mints the session token.
    let login = dispatch(
        &gateway,
        api("session.login", serde_json::json!({}), Some(ALICE_TOKEN)),
    )
    .await;
    assert_eq!(login.body["success"], true, "{:?}", login.body);
    let token = login.body["data"]["token"].as_str().unwrap().to_string();
    let session_id = login.body["data"]["session_id"].as_str().unwrap().to_string();

    // Invoke echo over HTTP with the session token.
    let via_http = dispatch(
        &gateway,
        api(
            "workflow.execute",
            serde_json::json!({"workflow": "echo", "inputs": {"message": "hi"}}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(via_http.body["data"]["result"]["echo"], "hi");

    // Invoke echo over the command channel with the same token.
    let via_cmd = dispatch(
        &gateway,
        cmd(
            "invoke",
            serde_json::json!({"workflow": "echo", "message": "hi"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(via_cmd.body["data"]["result"]["echo"], "hi");
    assert_eq!(
        via_http.body["data"]["result"],
        via_cmd.body["data"]["result"]
    );

    // Both channels reference the same session identity.
    for message in [
        api("session.whoami", serde_json::json!({}), Some(&token)),
        cmd("whoami", serde_json::json!({}), Some(&token)),
    ] {
        let who = dispatch(&gateway, message).await;
        assert_eq!(who.body["data"]["session_id"], session_id.as_str());
        assert_eq!(who.body["data"]["tenant_id"], "acme");
    }

    // The session records every channel that used it.
    let who = dispatch(&gateway, cmd("whoami", serde_json::json!({}), Some(&token))).await;
    let channels = who.body["data"]["channels"].as_array().unwrap();
    let names: Vec<&str> = channels.iter().filter_map(|c| c.as_str()).collect();
    assert!(names.contains(&"http"));
    assert!(names.contains(&"command"));
}

/// The same session token also works on the tool-invocation channel.
#[tokio::test]
async fn session_token_works_on_tool_channel() {
    let gateway = test_gateway();

    let login = dispatch(
        &gateway,
        api("session.login", serde_json::json!({}), Some(ALICE_TOKEN)),
    )
    .await;
    let token = login.body["data"]["token"].as_str().unwrap().to_string();

    let call = dispatch(
        &gateway,
        rpc(
            "tools/call",
            serde_json::json!({"name": "echo", "arguments": {"message": "tools"}}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(call.body["result"]["result"]["echo"], "tools");
}

/// Revocation is terminal and visible from every channel: once a session
/// is revoked, its token stops resolving everywhere.
#[tokio::test]
async fn revoked_session_fails_on_all_channels() {
    let gateway = test_gateway();

    let login = dispatch(
        &gateway,
        api("session.login", serde_json::json!({}), Some(ALICE_TOKEN)),
    )
    .await;
    let token = login.body["data"]["token"].as_str().unwrap().to_string();

    // The session works, then revokes itself over the command channel.
    let who = dispatch(&gateway, cmd("whoami", serde_json::json!({}), Some(&token))).await;
    assert_eq!(who.status, 200);

    let revoked = dispatch(&gateway, cmd("revoke", serde_json::json!({}), Some(&token))).await;
    assert_eq!(revoked.body["data"]["revoked"], true, "{:?}", revoked.body);

    for message in [
        api("session.whoami", serde_json::json!({}), Some(&token)),
        cmd("whoami", serde_json::json!({}), Some(&token)),
    ] {
        let response = dispatch(&gateway, message).await;
        assert_eq!(response.status, 401);
        assert_eq!(response.body["error"]["kind"], "authentication");
    }
}

/// Unknown tokens are rejected on every channel with the same error kind.
#[tokio::test]
async fn bad_token_rejected_uniformly() {
    let gateway = test_gateway();

    let http = dispatch(
        &gateway,
        api("session.whoami", serde_json::json!({}), Some("nxs_bogus")),
    )
    .await;
    assert_eq!(http.status, 401);
    assert_eq!(http.body["error"]["kind"], "authentication");

    let command = dispatch(
        &gateway,
        cmd("whoami", serde_json::json!({}), Some("nxs_bogus")),
    )
    .await;
    assert_eq!(command.status, 401);

    let tool = dispatch(&gateway, rpc("tools/list", serde_json::json!({}), Some("nxs_bogus"))).await;
    assert_eq!(tool.body["error"]["data"]["kind"], "authentication");
}

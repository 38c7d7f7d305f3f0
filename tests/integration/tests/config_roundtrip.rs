//! Configuration load/save round-trips.

use nexus_core::Config;
use nexus_integration_tests::test_config;

#[test]
fn config_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json5");

    let mut config = test_config();
    config.gateway.port = 4242;
    config.sessions.ttl_secs = 900;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.gateway.port, 4242);
    assert_eq!(loaded.sessions.ttl_secs, 900);
    assert!(loaded.security.principals.contains_key("alice"));
    assert!(loaded.security.roles.contains_key("operator"));
    loaded.validate().unwrap();
}

#[test]
fn config_accepts_json5_comments() {
    let config = Config::parse(
        r#"{
            // gateway section
            gateway: { port: 5151 },
            executor: { quota_policy: "queue" },
        }"#,
    )
    .unwrap();
    assert_eq!(config.gateway.port, 5151);
    assert_eq!(
        config.executor.quota_policy,
        nexus_core::config::QuotaPolicy::Queue
    );
}

#[test]
fn invalid_config_is_rejected_with_all_errors() {
    let mut config = test_config();
    config.gateway.port = 0;
    config.security.rate_limit.max_requests = 0;

    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("port"));
    assert!(err.contains("max_requests"));
}

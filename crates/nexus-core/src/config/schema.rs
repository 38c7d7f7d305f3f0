//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main Nexus configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session management.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Security settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Workflow executor settings.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Event router settings.
    #[serde(default)]
    pub events: EventsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind mode.
    #[serde(default)]
    pub bind: BindMode,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Maximum concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Whether unauthenticated requests are rejected outright instead of
    /// being served an anonymous session.
    #[serde(default)]
    pub require_auth: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: BindMode::default(),
            port: default_port(),
            cors: true,
            max_connections: default_max_connections(),
            require_auth: false,
        }
    }
}

/// Network bind mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Loopback only.
    #[default]
    Loopback,

    /// All interfaces.
    Lan,
}

/// Session store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Session time-to-live in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Expiry sweep interval in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Maximum compare-and-swap retries on concurrent touch.
    #[serde(default = "default_touch_retries")]
    pub touch_retries: u32,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            touch_retries: default_touch_retries(),
        }
    }
}

/// Security settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Known principals keyed by name.
    #[serde(default)]
    pub principals: HashMap<String, PrincipalConfig>,

    /// Role definitions: role name to granted `resource:action` permission
    /// strings. `*` matches any segment.
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,

    /// Rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Users holding an explicit cross-tenant grant for a tenant other
    /// than their own.
    #[serde(default)]
    pub cross_tenant_grants: Vec<CrossTenantGrant>,
}

/// A configured principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalConfig {
    /// User identifier.
    pub user_id: String,

    /// Tenant the principal belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    /// Granted roles.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Hex SHA-256 of the principal's bearer token. The plaintext token
    /// is never stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_sha256: Option<String>,

    /// Shared secret for signed tool-invocation requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

/// An explicit cross-tenant grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossTenantGrant {
    /// Grantee user identifier.
    pub user_id: String,

    /// Tenant the grant reaches into.
    pub tenant: String,
}

/// Rate limit settings, applied per (session, channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sliding window length in seconds.
    #[serde(default = "default_rate_window")]
    pub window_secs: u64,

    /// Maximum requests per window.
    #[serde(default = "default_rate_max")]
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_rate_window(),
            max_requests: default_rate_max(),
        }
    }
}

/// Workflow executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum concurrently running workflows per tenant.
    #[serde(default = "default_tenant_concurrency")]
    pub max_concurrent_per_tenant: usize,

    /// What to do when the per-tenant quota is exhausted.
    #[serde(default)]
    pub quota_policy: QuotaPolicy,

    /// How long synchronous-style channels wait for a terminal status
    /// before falling back to returning the run id.
    #[serde(default = "default_wait_budget")]
    pub wait_budget_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_tenant: default_tenant_concurrency(),
            quota_policy: QuotaPolicy::default(),
            wait_budget_ms: default_wait_budget(),
        }
    }
}

/// Behavior when per-tenant execution quota is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPolicy {
    /// Reject with a rate-limit error carrying a backoff hint.
    #[default]
    Reject,

    /// Leave the run queued until a slot frees.
    Queue,
}

/// Event router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Per-subscriber queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Keep-alive interval for idle push connections, in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `nexus=debug`. Overridden by `NEXUS_LOG`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Emit JSON log lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_port() -> u16 {
    18930
}

fn default_max_connections() -> usize {
    100
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_touch_retries() -> u32 {
    8
}

fn default_rate_window() -> u64 {
    60
}

fn default_rate_max() -> u32 {
    120
}

fn default_tenant_concurrency() -> usize {
    4
}

fn default_wait_budget() -> u64 {
    2000
}

fn default_queue_capacity() -> usize {
    256
}

fn default_keep_alive() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

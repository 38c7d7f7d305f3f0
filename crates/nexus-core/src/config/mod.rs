//! Configuration loading, validation, and management.

mod loader;
mod schema;

pub use schema::{
    BindMode, Config, CrossTenantGrant, EventsConfig, ExecutorConfig, GatewayConfig,
    LoggingConfig, PrincipalConfig, QuotaPolicy, RateLimitConfig, SecurityConfig,
    SessionsConfig,
};

//! Security manager for the Nexus gateway.
//!
//! One component gates every operation regardless of entry channel:
//! authentication (bearer token, stored command-line token, signed
//! tool-invocation request), pluggable authorization strategies, sliding
//! window rate limiting, and tenant isolation. Every authorization
//! decision, allow or deny, is appended to the audit trail.

mod authorizer;
mod manager;
mod principal;
mod rate_limit;

pub use authorizer::{
    AttributeStrategy, AuthorizationStrategy, HybridStrategy, RoleStrategy, StrategyDecision,
    Subject,
};
pub use manager::{Credentials, SecurityManager};
pub use principal::{Principal, PrincipalRegistry};
pub use rate_limit::RateLimiter;

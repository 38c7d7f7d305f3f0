//! Pluggable authorization strategies.

use nexus_core::Session;

/// The subject of an authorization check: the session plus the permission
/// strings its user holds.
#[derive(Debug)]
pub struct Subject<'a> {
    /// Session performing the action.
    pub session: &'a Session,

    /// Permission strings resolved from the subject's roles.
    pub permissions: &'a [String],
}

/// Outcome of one strategy's evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyDecision {
    /// Allowed, with a reason for the audit record.
    Allow(String),

    /// Denied, with a reason for the audit record.
    Deny(String),

    /// This strategy has no opinion; defer to the next one.
    Abstain,
}

/// A swappable authorization strategy. Callers never change when the
/// strategy does.
pub trait AuthorizationStrategy: Send + Sync {
    /// Strategy name, recorded in audit reasons.
    fn name(&self) -> &'static str;

    /// Evaluate (subject, resource, action).
    fn authorize(&self, subject: &Subject<'_>, resource: &str, action: &str) -> StrategyDecision;
}

/// Role-based strategy: the subject's permission strings are matched
/// against `resource_kind:action`.
///
/// A permission string is `kind:action` where either segment may be `*`;
/// the single string `*` grants everything. The resource kind is the part
/// of the resource name before the first `:` (`workflow:w1` has kind
/// `workflow`).
#[derive(Debug, Default)]
pub struct RoleStrategy;

impl RoleStrategy {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }

    fn permission_matches(permission: &str, resource_kind: &str, action: &str) -> bool {
        if permission == "*" {
            return true;
        }
        let Some((perm_kind, perm_action)) = permission.split_once(':') else {
            return false;
        };
        (perm_kind == "*" || perm_kind == resource_kind)
            && (perm_action == "*" || perm_action == action)
    }
}

impl AuthorizationStrategy for RoleStrategy {
    fn name(&self) -> &'static str {
        "role"
    }

    fn authorize(&self, subject: &Subject<'_>, resource: &str, action: &str) -> StrategyDecision {
        let resource_kind = resource.split(':').next().unwrap_or(resource);
        for permission in subject.permissions {
            if Self::permission_matches(permission, resource_kind, action) {
                return StrategyDecision::Allow(format!(
                    "role grants '{permission}' on {resource_kind}:{action}"
                ));
            }
        }
        StrategyDecision::Abstain
    }
}

/// Attribute-based strategy: decisions from subject attributes rather
/// than granted roles. Grants the configured actions to any authenticated
/// (non-anonymous) subject, and a separate set to anonymous subjects.
#[derive(Debug)]
pub struct AttributeStrategy {
    authenticated_actions: Vec<String>,
    anonymous_actions: Vec<String>,
}

impl AttributeStrategy {
    /// Create with explicit action sets.
    pub fn new(authenticated_actions: Vec<String>, anonymous_actions: Vec<String>) -> Self {
        Self {
            authenticated_actions,
            anonymous_actions,
        }
    }

    /// Default policy: authenticated sessions may discover and inspect
    /// (`list`, `status`, `whoami`); anonymous sessions may only discover.
    pub fn defaults() -> Self {
        Self::new(
            vec!["list".to_string(), "status".to_string(), "whoami".to_string()],
            vec!["list".to_string()],
        )
    }
}

impl AuthorizationStrategy for AttributeStrategy {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn authorize(&self, subject: &Subject<'_>, _resource: &str, action: &str) -> StrategyDecision {
        let allowed = if subject.session.is_anonymous() {
            &self.anonymous_actions
        } else {
            &self.authenticated_actions
        };
        if allowed.iter().any(|a| a == action) {
            StrategyDecision::Allow(format!("attribute policy grants '{action}'"))
        } else {
            StrategyDecision::Abstain
        }
    }
}

/// Hybrid strategy: evaluates inner strategies in order; the first
/// non-abstaining decision wins, and everything-abstained is a deny.
pub struct HybridStrategy {
    strategies: Vec<Box<dyn AuthorizationStrategy>>,
}

impl HybridStrategy {
    /// Compose strategies in evaluation order.
    pub fn new(strategies: Vec<Box<dyn AuthorizationStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default stack: roles first, then attribute policy.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(RoleStrategy::new()),
            Box::new(AttributeStrategy::defaults()),
        ])
    }
}

impl AuthorizationStrategy for HybridStrategy {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn authorize(&self, subject: &Subject<'_>, resource: &str, action: &str) -> StrategyDecision {
        for strategy in &self.strategies {
            match strategy.authorize(subject, resource, action) {
                StrategyDecision::Abstain => continue,
                decision => return decision,
            }
        }
        StrategyDecision::Deny(format!("no strategy grants '{action}' on '{resource}'"))
    }
}

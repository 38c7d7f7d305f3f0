//! Audit types.
//!
//! Every authorization decision, allow or deny, becomes an
//! [`AuthDecision`] appended to the audit trail. Records are never
//! updated.

use super::{ChannelKind, RequestId, SessionId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One authorization decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDecision {
    /// Session the decision was made for.
    pub session_id: SessionId,

    /// Tenant of the subject session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Resource the action targeted, e.g. `workflow:w1`.
    pub resource: String,

    /// Action, e.g. `execute`.
    pub action: String,

    /// Outcome.
    pub outcome: DecisionOutcome,

    /// Human-readable reason.
    pub reason: String,

    /// Severity. Tenant-isolation violations are `Elevated`.
    #[serde(default)]
    pub severity: AuditSeverity,

    /// Channel the request arrived on, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelKind>,

    /// Request correlation identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,

    /// Decision timestamp.
    pub timestamp: DateTime<Utc>,
}

impl AuthDecision {
    /// Record an allow decision.
    pub fn allow(
        session_id: SessionId,
        resource: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(session_id, resource, action, DecisionOutcome::Allow, reason)
    }

    /// Record a deny decision.
    pub fn deny(
        session_id: SessionId,
        resource: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(session_id, resource, action, DecisionOutcome::Deny, reason)
    }

    fn new(
        session_id: SessionId,
        resource: impl Into<String>,
        action: impl Into<String>,
        outcome: DecisionOutcome,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            tenant_id: None,
            resource: resource.into(),
            action: action.into(),
            outcome,
            reason: reason.into(),
            severity: AuditSeverity::Routine,
            channel: None,
            request_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the subject tenant.
    pub fn with_tenant(mut self, tenant_id: Option<TenantId>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Set the channel.
    pub fn with_channel(mut self, channel: ChannelKind) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Set the request correlation id.
    pub fn with_request(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Mark as a security incident (tenant-isolation violation).
    pub fn elevated(mut self) -> Self {
        self.severity = AuditSeverity::Elevated;
        self
    }

    /// Whether the decision allowed the action.
    pub fn is_allowed(&self) -> bool {
        self.outcome == DecisionOutcome::Allow
    }
}

/// Decision outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    Allow,
    Deny,
}

/// Audit record severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Ordinary allow/deny.
    #[default]
    Routine,

    /// Security incident, logged louder than an ordinary denial.
    Elevated,
}

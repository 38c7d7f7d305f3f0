//! Execution run types.

use super::{RunId, SessionId, TenantId, WorkflowId};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One execution instance of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRun {
    /// Globally unique run identifier, immutable once assigned.
    pub run_id: RunId,

    /// Workflow identity.
    pub workflow_id: WorkflowId,

    /// Workflow version that was resolved for this run.
    pub workflow_version: Version,

    /// Session that started the run.
    pub session_id: SessionId,

    /// Tenant scope inherited from the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Validated inputs the run was started with.
    pub inputs: Value,

    /// Current status. Transitions are monotonic.
    pub status: RunStatus,

    /// When the run was accepted.
    pub queued_at: DateTime<Utc>,

    /// When the runtime call began.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Runtime result, present once `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Runtime error detail, present once `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRun {
    /// Create a run in `Queued`.
    pub fn queued(
        workflow_id: WorkflowId,
        workflow_version: Version,
        session_id: SessionId,
        tenant_id: Option<TenantId>,
        inputs: Value,
    ) -> Self {
        Self {
            run_id: RunId::generate(),
            workflow_id,
            workflow_version,
            session_id,
            tenant_id,
            inputs,
            status: RunStatus::Queued,
            queued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    /// Apply a status transition. Returns `false` (leaving the run
    /// untouched) when the transition would violate monotonicity.
    pub fn transition(&mut self, next: RunStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        match next {
            RunStatus::Running => self.started_at = Some(now),
            s if s.is_terminal() => self.finished_at = Some(now),
            _ => {}
        }
        self.status = next;
        true
    }

    /// Whether the run has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Run lifecycle status.
///
/// `queued → running → {completed, failed, cancelled}`; terminal states
/// absorb, so readers may poll without locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a transition to `next` is allowed.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Running) => true,
            // A queued run may be cancelled before it ever starts.
            (Self::Queued, Self::Cancelled) => true,
            (Self::Running, s) if s.is_terminal() => true,
            _ => false,
        }
    }

    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

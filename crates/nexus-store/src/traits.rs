//! Storage traits.

use crate::StoreResult;
use async_trait::async_trait;
use nexus_core::{
    AuthDecision, ExecutionRun, RunId, RunStatus, Session, SessionId, SessionState, TenantId,
};
use serde_json::Value;

/// A persisted session together with the hash of its opaque token.
///
/// The plaintext token is handed to the caller exactly once at creation and
/// never stored.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// The session.
    pub session: Session,

    /// Hex SHA-256 of the session token.
    pub token_hash: String,
}

/// Persistence for session records. Exclusively owned by the session store.
#[async_trait]
pub trait SessionRecords: Send + Sync {
    /// Insert a new record. Fails on duplicate session id.
    async fn insert(&self, record: SessionRecord) -> StoreResult<()>;

    /// Fetch a session by id.
    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>>;

    /// Fetch a session by its token hash. Must behave identically no
    /// matter which channel performed the lookup.
    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    /// Compare-and-swap update: persists `session` only if the stored
    /// version equals `expected_version`. Returns whether the swap
    /// happened.
    async fn update(&self, expected_version: u64, session: Session) -> StoreResult<bool>;

    /// Move a session into a terminal state. Returns `false` if the
    /// session is unknown or already terminal.
    async fn mark_state(&self, id: &SessionId, state: SessionState) -> StoreResult<bool>;

    /// All sessions (sweep and diagnostics).
    async fn list(&self) -> StoreResult<Vec<Session>>;
}

/// Persistence for execution runs. Exclusively owned by the workflow
/// executor.
#[async_trait]
pub trait RunRecords: Send + Sync {
    /// Insert a new run. Fails on duplicate run id.
    async fn insert(&self, run: ExecutionRun) -> StoreResult<()>;

    /// Fetch a run by id.
    async fn get(&self, id: &RunId) -> StoreResult<Option<ExecutionRun>>;

    /// Atomically apply a monotonic status transition. Returns the updated
    /// run, or `None` if the run is unknown or the transition is not
    /// allowed from the current status.
    async fn transition(&self, id: &RunId, next: RunStatus) -> StoreResult<Option<ExecutionRun>>;

    /// Atomically move a run to a terminal status and attach its result or
    /// error. Same return contract as [`RunRecords::transition`].
    async fn finish(
        &self,
        id: &RunId,
        next: RunStatus,
        result: Option<Value>,
        error: Option<String>,
    ) -> StoreResult<Option<ExecutionRun>>;

    /// Runs started by a session, newest first.
    async fn list_for_session(&self, session_id: &SessionId) -> StoreResult<Vec<ExecutionRun>>;

    /// Number of runs currently in a non-terminal status. With a tenant,
    /// counts only that tenant's runs; with `None`, counts all runs.
    async fn active_count(&self, tenant_id: Option<&TenantId>) -> StoreResult<usize>;
}

/// Append-only persistence for authorization decisions.
#[async_trait]
pub trait AuditRecords: Send + Sync {
    /// Append a decision. Records are never updated.
    async fn append(&self, decision: AuthDecision) -> StoreResult<()>;

    /// Most recent decisions, newest first, up to `limit`.
    async fn recent(&self, limit: usize) -> StoreResult<Vec<AuthDecision>>;
}

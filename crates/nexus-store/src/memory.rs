//! In-memory reference storage backend.

use crate::traits::{AuditRecords, RunRecords, SessionRecord, SessionRecords};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use dashmap::DashMap;
use nexus_core::{
    AuthDecision, ExecutionRun, RunId, RunStatus, Session, SessionId, SessionState, TenantId,
};
use parking_lot::Mutex;
use serde_json::Value;

/// In-memory implementation of all three record stores.
///
/// Backed by concurrent maps; suitable for tests and single-process
/// deployments. A process restart loses state; production deployments
/// inject persistent backends instead.
#[derive(Default)]
pub struct MemoryStore {
    sessions: DashMap<SessionId, SessionRecord>,
    token_index: DashMap<String, SessionId>,
    runs: DashMap<RunId, ExecutionRun>,
    audit: Mutex<Vec<AuthDecision>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRecords for MemoryStore {
    async fn insert(&self, record: SessionRecord) -> StoreResult<()> {
        let id = record.session.id.clone();
        if self.sessions.contains_key(&id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        self.token_index.insert(record.token_hash.clone(), id.clone());
        self.sessions.insert(id, record);
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.get(id).map(|r| r.session.clone()))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        let Some(id) = self.token_index.get(token_hash).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        SessionRecords::get(self, &id).await
    }

    async fn update(&self, expected_version: u64, session: Session) -> StoreResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(&session.id) else {
            return Ok(false);
        };
        if entry.session.version != expected_version {
            return Ok(false);
        }
        entry.session = session;
        Ok(true)
    }

    async fn mark_state(&self, id: &SessionId, state: SessionState) -> StoreResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(id) else {
            return Ok(false);
        };
        if entry.session.is_terminal() {
            return Ok(false);
        }
        entry.session.state = state;
        entry.session.version += 1;
        Ok(true)
    }

    async fn list(&self) -> StoreResult<Vec<Session>> {
        Ok(self.sessions.iter().map(|r| r.session.clone()).collect())
    }
}

#[async_trait]
impl RunRecords for MemoryStore {
    async fn insert(&self, run: ExecutionRun) -> StoreResult<()> {
        let id = run.run_id.clone();
        if self.runs.contains_key(&id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        self.runs.insert(id, run);
        Ok(())
    }

    async fn get(&self, id: &RunId) -> StoreResult<Option<ExecutionRun>> {
        Ok(self.runs.get(id).map(|r| r.value().clone()))
    }

    async fn transition(&self, id: &RunId, next: RunStatus) -> StoreResult<Option<ExecutionRun>> {
        let Some(mut entry) = self.runs.get_mut(id) else {
            return Ok(None);
        };
        if !entry.transition(next) {
            return Ok(None);
        }
        Ok(Some(entry.value().clone()))
    }

    async fn finish(
        &self,
        id: &RunId,
        next: RunStatus,
        result: Option<Value>,
        error: Option<String>,
    ) -> StoreResult<Option<ExecutionRun>> {
        let Some(mut entry) = self.runs.get_mut(id) else {
            return Ok(None);
        };
        if !entry.transition(next) {
            return Ok(None);
        }
        entry.result = result;
        entry.error = error;
        Ok(Some(entry.value().clone()))
    }

    async fn list_for_session(&self, session_id: &SessionId) -> StoreResult<Vec<ExecutionRun>> {
        let mut runs: Vec<ExecutionRun> = self
            .runs
            .iter()
            .filter(|r| &r.session_id == session_id)
            .map(|r| r.value().clone())
            .collect();
        runs.sort_by(|a, b| b.queued_at.cmp(&a.queued_at));
        Ok(runs)
    }

    async fn active_count(&self, tenant_id: Option<&TenantId>) -> StoreResult<usize> {
        Ok(self
            .runs
            .iter()
            .filter(|r| !r.is_terminal())
            .filter(|r| tenant_id.is_none() || r.tenant_id.as_ref() == tenant_id)
            .count())
    }
}

#[async_trait]
impl AuditRecords for MemoryStore {
    async fn append(&self, decision: AuthDecision) -> StoreResult<()> {
        self.audit.lock().push(decision);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> StoreResult<Vec<AuthDecision>> {
        let audit = self.audit.lock();
        Ok(audit.iter().rev().take(limit).cloned().collect())
    }
}

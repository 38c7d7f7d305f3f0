//! The workflow executor.

use crate::quota::TenantQuotas;
use crate::registry::WorkflowRegistry;
use crate::runtime::WorkflowRuntime;
use nexus_core::config::{ExecutorConfig, QuotaPolicy};
use nexus_core::{
    ChannelKind, DeliveryMode, ExecutionRun, NexusError, NexusEvent, RequestId, Result, RunId,
    RunStatus, Session, SessionId, WorkflowHandle,
};
use nexus_events::EventRouter;
use nexus_security::SecurityManager;
use nexus_store::RunRecords;
use semver::Version;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Coordinates workflow execution: authorization, quota, run lifecycle,
/// delegation to the external runtime, and lifecycle event publication.
pub struct WorkflowExecutor {
    registry: Arc<WorkflowRegistry>,
    runtime: Arc<dyn WorkflowRuntime>,
    runs: Arc<dyn RunRecords>,
    security: Arc<SecurityManager>,
    events: Arc<EventRouter>,
    quotas: Arc<TenantQuotas>,
    quota_policy: QuotaPolicy,
    wait_budget: Duration,
}

impl WorkflowExecutor {
    /// Create an executor.
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        runtime: Arc<dyn WorkflowRuntime>,
        runs: Arc<dyn RunRecords>,
        security: Arc<SecurityManager>,
        events: Arc<EventRouter>,
        config: &ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            runtime,
            runs,
            security,
            events,
            quotas: Arc::new(TenantQuotas::new(config.max_concurrent_per_tenant)),
            quota_policy: config.quota_policy,
            wait_budget: Duration::from_millis(config.wait_budget_ms),
        }
    }

    /// The workflow registry.
    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    /// Configured wait budget for synchronous-style channels.
    pub fn wait_budget(&self) -> Duration {
        self.wait_budget
    }

    /// Resolve a workflow handle. Missing handle is `NotFound`.
    pub fn resolve(
        &self,
        id: &nexus_core::WorkflowId,
        version: Option<&Version>,
    ) -> Result<WorkflowHandle> {
        self.registry.resolve(id, version)
    }

    /// Validate inputs against the handle's declared schema before any
    /// execution resource is committed.
    pub fn validate(&self, handle: &WorkflowHandle, inputs: &Value) -> Result<Map<String, Value>> {
        handle
            .input_schema
            .validate(inputs)
            .map_err(|errors| NexusError::Validation(errors.join("; ")))
    }

    /// Start a run.
    ///
    /// Authorization and quota commit before the runtime is involved; a
    /// denied check creates no run. The returned record is the `queued`
    /// snapshot; the run itself may outlive the originating request and
    /// is identified thereafter by its run id.
    pub async fn execute(
        &self,
        handle: &WorkflowHandle,
        validated: Map<String, Value>,
        session: &Session,
        channel: ChannelKind,
        request_id: &RequestId,
    ) -> Result<ExecutionRun> {
        let resource = handle.resource();
        self.security
            .enforce_tenant_isolation(
                session,
                handle.tenant_id.as_ref(),
                &resource,
                channel,
                request_id,
            )
            .await?;
        self.security
            .authorize(session, &resource, "execute", channel, request_id)
            .await?;

        // Reject policy takes its slot now, so exhaustion surfaces before
        // a run record exists. Queue policy defers to the driver.
        let permit = match self.quota_policy {
            QuotaPolicy::Reject => Some(self.quotas.try_acquire(session.tenant_id.as_ref())?),
            QuotaPolicy::Queue => None,
        };

        let run = ExecutionRun::queued(
            handle.id.clone(),
            handle.version.clone(),
            session.id.clone(),
            session.tenant_id.clone(),
            Value::Object(validated.clone()),
        );
        self.runs.insert(run.clone()).await?;
        debug!(run_id = %run.run_id, workflow = %handle.id, "run accepted");

        self.spawn_driver(
            run.run_id.clone(),
            run.tenant_id.clone(),
            handle.clone(),
            validated,
            channel,
            permit,
        );
        Ok(run)
    }

    /// Fetch a run. Unknown id is `NotFound`.
    pub async fn get_run(&self, run_id: &RunId) -> Result<ExecutionRun> {
        self.runs
            .get(run_id)
            .await?
            .ok_or_else(|| NexusError::NotFound(format!("run '{run_id}'")))
    }

    /// Runs started by a session, newest first.
    pub async fn runs_for_session(&self, session_id: &SessionId) -> Result<Vec<ExecutionRun>> {
        Ok(self.runs.list_for_session(session_id).await?)
    }

    /// Runs currently in a non-terminal status, across all tenants.
    pub async fn active_runs(&self) -> Result<usize> {
        Ok(self.runs.active_count(None).await?)
    }

    /// Best-effort cooperative cancellation.
    ///
    /// Queued runs cancel immediately (nothing is in flight). Running runs
    /// transition to `cancelled` only if the runtime acknowledges;
    /// otherwise the run keeps running to natural completion.
    pub async fn cancel(
        &self,
        run_id: &RunId,
        session: &Session,
        channel: ChannelKind,
        request_id: &RequestId,
    ) -> Result<ExecutionRun> {
        let run = self.get_run(run_id).await?;
        let resource = format!("run:{run_id}");
        self.security
            .enforce_tenant_isolation(session, run.tenant_id.as_ref(), &resource, channel, request_id)
            .await?;
        self.security
            .authorize(session, &resource, "cancel", channel, request_id)
            .await?;

        if run.is_terminal() {
            return Ok(run);
        }

        if run.status == RunStatus::Queued {
            if let Some(updated) = self.runs.transition(run_id, RunStatus::Cancelled).await? {
                self.publish_lifecycle(&updated, channel).await;
                return Ok(updated);
            }
            // Raced into running; fall through to the cooperative path.
        }

        if self.runtime.cancel(run_id).await {
            if let Some(updated) = self
                .runs
                .finish(run_id, RunStatus::Cancelled, None, None)
                .await?
            {
                self.publish_lifecycle(&updated, channel).await;
                return Ok(updated);
            }
        } else {
            debug!(run_id = %run_id, "cancellation not acknowledged by runtime");
        }

        self.get_run(run_id).await
    }

    /// Poll a run until it reaches a terminal status or the budget
    /// elapses. Never cancels; on timeout the caller falls back to the
    /// run id.
    pub async fn wait_for_terminal(&self, run_id: &RunId, budget: Duration) -> Result<ExecutionRun> {
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            let run = self.get_run(run_id).await?;
            if run.is_terminal() || tokio::time::Instant::now() >= deadline {
                return Ok(run);
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    fn spawn_driver(
        &self,
        run_id: RunId,
        tenant: Option<nexus_core::TenantId>,
        handle: WorkflowHandle,
        inputs: Map<String, Value>,
        channel: ChannelKind,
        permit: Option<tokio::sync::OwnedSemaphorePermit>,
    ) {
        let runtime = self.runtime.clone();
        let runs = self.runs.clone();
        let events = self.events.clone();
        let quotas = self.quotas.clone();

        tokio::spawn(async move {
            let _permit = match permit {
                Some(permit) => permit,
                None => match quotas.acquire(tenant.as_ref()).await {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!(run_id = %run_id, "quota wait failed: {e}");
                        let _ = runs
                            .finish(
                                &run_id,
                                RunStatus::Failed,
                                None,
                                Some("quota wait failed".to_string()),
                            )
                            .await;
                        return;
                    }
                },
            };

            // A run cancelled while queued never starts.
            let running = match runs.transition(&run_id, RunStatus::Running).await {
                Ok(Some(run)) => run,
                Ok(None) => return,
                Err(e) => {
                    warn!(run_id = %run_id, "failed to mark run running: {e}");
                    return;
                }
            };
            publish_event(&events, &running, channel).await;

            // No lock is held across this call; the runtime is a black box
            // that may take arbitrarily long.
            let outcome = runtime.run(&run_id, &handle, &inputs).await;

            let finished = match outcome {
                Ok(result) => {
                    runs.finish(&run_id, RunStatus::Completed, Some(result), None)
                        .await
                }
                Err(e) => {
                    let detail = if e.transient {
                        format!("{} (transient)", e.message)
                    } else {
                        e.message
                    };
                    runs.finish(&run_id, RunStatus::Failed, None, Some(detail)).await
                }
            };

            match finished {
                // None means cancellation won the race; the terminal
                // status already published.
                Ok(Some(run)) => publish_event(&events, &run, channel).await,
                Ok(None) => {}
                Err(e) => warn!(run_id = %run_id, "failed to persist run outcome: {e}"),
            }
        });
    }

    async fn publish_lifecycle(&self, run: &ExecutionRun, channel: ChannelKind) {
        publish_event(&self.events, run, channel).await;
    }
}

/// Publish the lifecycle event matching a run's current status.
async fn publish_event(events: &EventRouter, run: &ExecutionRun, channel: ChannelKind) {
    let event_type = match run.status {
        RunStatus::Running => "workflow.started",
        RunStatus::Completed => "workflow.completed",
        RunStatus::Failed => "workflow.failed",
        RunStatus::Cancelled => "workflow.cancelled",
        RunStatus::Queued => return,
    };
    let payload = serde_json::json!({
        "run_id": run.run_id,
        "workflow_id": run.workflow_id,
        "version": run.workflow_version.to_string(),
        "status": run.status.as_str(),
    });
    let event = NexusEvent::new(
        event_type,
        channel,
        run.session_id.clone(),
        run.tenant_id.clone(),
        payload,
    );
    events.publish(event, DeliveryMode::Persistent).await;
}

//! The external execution runtime boundary.

use async_trait::async_trait;
use nexus_core::{RunId, WorkflowHandle};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by the external runtime.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RuntimeError {
    /// Runtime error detail.
    pub message: String,

    /// Whether the runtime declares this failure transient. This core
    /// never retries either way; the flag is surfaced to the caller.
    pub transient: bool,
}

impl RuntimeError {
    /// A permanent failure.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    /// A transient failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }
}

/// The opaque workflow body executor, injected by configuration. This core
/// never looks inside a workflow; it only hands over the handle and the
/// validated inputs.
#[async_trait]
pub trait WorkflowRuntime: Send + Sync {
    /// Execute the workflow body. The run id is passed so a cooperative
    /// runtime can correlate a later [`WorkflowRuntime::cancel`] call.
    async fn run(
        &self,
        run_id: &RunId,
        handle: &WorkflowHandle,
        inputs: &Map<String, Value>,
    ) -> std::result::Result<Value, RuntimeError>;

    /// Advisory cancellation. Returns whether the runtime acknowledges the
    /// request; the contract is "request delivered", not "work stopped".
    async fn cancel(&self, _run_id: &RunId) -> bool {
        false
    }
}

/// Built-in reference runtime.
///
/// Behavior, driven entirely by the inputs map:
/// - `message`: echoed back as `{"echo": <message>}`
/// - `delay_ms`: sleep before completing, checking for cancellation
/// - `fail` (true): fail; `transient` (true) marks the failure transient
///
/// Real deployments replace this with their own runtime.
#[derive(Default)]
pub struct EchoRuntime {
    cancels: Mutex<HashMap<RunId, Arc<AtomicBool>>>,
}

impl EchoRuntime {
    /// Create the runtime.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRuntime for EchoRuntime {
    async fn run(
        &self,
        run_id: &RunId,
        _handle: &WorkflowHandle,
        inputs: &Map<String, Value>,
    ) -> std::result::Result<Value, RuntimeError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.cancels.lock().insert(run_id.clone(), cancelled.clone());

        let result = run_body(inputs, &cancelled).await;

        self.cancels.lock().remove(run_id);
        result
    }

    async fn cancel(&self, run_id: &RunId) -> bool {
        match self.cancels.lock().get(run_id) {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

async fn run_body(
    inputs: &Map<String, Value>,
    cancelled: &AtomicBool,
) -> std::result::Result<Value, RuntimeError> {
    let delay_ms = inputs.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
    if delay_ms > 0 {
        let mut remaining = delay_ms;
        while remaining > 0 {
            if cancelled.load(Ordering::Relaxed) {
                return Err(RuntimeError::permanent("cancelled by request"));
            }
            let step = remaining.min(10);
            tokio::time::sleep(std::time::Duration::from_millis(step)).await;
            remaining -= step;
        }
    }

    if inputs.get("fail").and_then(Value::as_bool).unwrap_or(false) {
        let transient = inputs
            .get("transient")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        return Err(RuntimeError {
            message: "workflow body failed".to_string(),
            transient,
        });
    }

    let message = inputs.get("message").cloned().unwrap_or(Value::Null);
    Ok(serde_json::json!({ "echo": message }))
}

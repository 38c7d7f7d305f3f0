//! Common type definitions shared across Nexus crates.

pub mod audit;
pub mod channel;
pub mod event;
pub mod identifiers;
pub mod run;
pub mod session;
pub mod workflow;

pub use audit::{AuditSeverity, AuthDecision, DecisionOutcome};
pub use channel::{ChannelKind, OperationDescriptor};
pub use event::{DeliveryMode, NexusEvent};
pub use identifiers::{
    EventId, RequestId, RunId, SessionId, SubscriptionId, TenantId, UserId, WorkflowId,
};
pub use run::{ExecutionRun, RunStatus};
pub use session::{Session, SessionState};
pub use workflow::{FieldSpec, FieldType, InputSchema, WorkflowHandle};

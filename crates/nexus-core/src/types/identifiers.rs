//! Strongly-typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id! {
    /// Channel-independent session identifier.
    SessionId
}

string_id! {
    /// Tenant isolation boundary identifier.
    TenantId
}

string_id! {
    /// User identifier owning a session.
    UserId
}

string_id! {
    /// Workflow identifier. Versions are tracked separately on the handle.
    WorkflowId
}

string_id! {
    /// Execution run identifier. Globally unique, immutable once assigned.
    RunId
}

string_id! {
    /// Published event identifier, used as a resumption cursor by push
    /// subscribers.
    EventId
}

string_id! {
    /// Handle for an event subscription, usable to unsubscribe.
    SubscriptionId
}

string_id! {
    /// Request identifier for tracing and audit correlation.
    RequestId
}

impl SessionId {
    /// Generate a fresh random session identifier.
    pub fn generate() -> Self {
        Self(format!("sess-{}", Uuid::new_v4()))
    }
}

impl RunId {
    /// Generate a fresh random run identifier.
    pub fn generate() -> Self {
        Self(format!("run-{}", Uuid::new_v4()))
    }
}

impl EventId {
    /// Generate a fresh random event identifier.
    pub fn generate() -> Self {
        Self(format!("evt-{}", Uuid::new_v4()))
    }
}

impl SubscriptionId {
    /// Generate a fresh random subscription identifier.
    pub fn generate() -> Self {
        Self(format!("sub-{}", Uuid::new_v4()))
    }
}

impl RequestId {
    /// Generate a fresh random request identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::generate()
    }
}

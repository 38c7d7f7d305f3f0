//! Request context.

use chrono::{DateTime, Utc};
use nexus_core::{ChannelKind, RequestId, Session};

/// Fully constructed context for one inbound request: the detected
/// channel, the resolved session, and the correlation id that ties the
/// response to the audit trail.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation identifier, generated at ingress.
    pub request_id: RequestId,

    /// Channel the request arrived on.
    pub channel: ChannelKind,

    /// Resolved session (anonymous when no credentials were presented).
    pub session: Session,

    /// Raw credential the caller presented, passed through for operations
    /// that need to re-assert it (`session.login`).
    pub token: Option<String>,

    /// Ingress timestamp.
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    /// Create a context for a session.
    pub fn new(channel: ChannelKind, session: Session, token: Option<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            channel,
            session,
            token,
            received_at: Utc::now(),
        }
    }
}

//! Response envelope types.
//!
//! Every channel formats results into its own wire shape, but the HTTP
//! and command channels share the envelope defined here:
//! `{ success, data | error, metadata: { request_id, timestamp } }`.
//! Error bodies expose the error kind, a human-readable message, and the
//! correlation id, never stack traces or storage detail.

use crate::context::RequestContext;
use nexus_core::NexusError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

/// Protocol-agnostic response: a status category plus the body the
/// adapter formatted for its wire.
#[derive(Debug, Clone)]
pub struct ChannelResponse {
    /// HTTP-compatible status code.
    pub status: u16,

    /// Response body.
    pub body: Value,
}

impl ChannelResponse {
    /// A 200 response.
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// The shared response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the operation succeeded.
    pub success: bool,

    /// Result payload (on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error detail (on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,

    /// Response metadata.
    pub metadata: Metadata,
}

/// Envelope metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Correlation identifier tying the response to the audit trail.
    pub request_id: String,

    /// Response timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Channel that served the request.
    pub channel: String,
}

/// User-visible error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error kind (`validation`, `authorization`, ...).
    pub kind: String,

    /// Human-readable message.
    pub message: String,

    /// Backoff hint for rate-limit errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl Envelope {
    /// Build a success envelope.
    pub fn success(ctx: &RequestContext, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: Metadata {
                request_id: ctx.request_id.to_string(),
                timestamp: chrono::Utc::now(),
                channel: ctx.channel.to_string(),
            },
        }
    }

    /// Build an error envelope from a taxonomy error.
    pub fn failure(ctx: &RequestContext, err: &NexusError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error_body(err)),
            metadata: Metadata {
                request_id: ctx.request_id.to_string(),
                timestamp: chrono::Utc::now(),
                channel: ctx.channel.to_string(),
            },
        }
    }
}

/// User-visible error body for a taxonomy error. Internal faults are
/// collapsed to a generic message.
pub fn error_body(err: &NexusError) -> ErrorBody {
    let retry_after_ms = match err {
        NexusError::RateLimit { retry_after_ms } => Some(*retry_after_ms),
        _ => None,
    };
    let message = match err {
        // Never leak internal detail across the channel boundary.
        NexusError::Internal(_) | NexusError::Config(_) => {
            "internal error; see server logs".to_string()
        }
        other => other.to_string(),
    };
    ErrorBody {
        kind: err.kind().to_string(),
        message,
        retry_after_ms,
    }
}

/// HTTP status category for a taxonomy error: client errors for
/// validation/auth, server errors for execution failures.
pub fn status_for(err: &NexusError) -> u16 {
    match err {
        NexusError::Validation(_) => 400,
        NexusError::Authentication(_) => 401,
        NexusError::Authorization { .. } => 403,
        NexusError::NotFound(_) => 404,
        NexusError::RateLimit { .. } => 429,
        NexusError::Execution { .. } => 500,
        NexusError::Internal(_) | NexusError::Config(_) => 500,
    }
}

/// Log a failed request exactly once, at the channel boundary, with
/// enough context to correlate with the audit trail.
pub fn log_failure(ctx: &RequestContext, err: &NexusError) {
    let tenant = ctx
        .session
        .tenant_id
        .as_ref()
        .map(|t| t.as_str())
        .unwrap_or("-");
    match err {
        NexusError::Internal(detail) => {
            error!(
                request_id = %ctx.request_id,
                session_id = %ctx.session.id,
                tenant,
                kind = err.kind(),
                "request failed: {detail}"
            );
        }
        other => {
            info!(
                request_id = %ctx.request_id,
                session_id = %ctx.session.id,
                tenant,
                kind = other.kind(),
                "request failed: {other}"
            );
        }
    }
}

/// Format a failed request as the shared envelope, logging it once.
pub fn failure_response(ctx: &RequestContext, err: &NexusError) -> ChannelResponse {
    log_failure(ctx, err);
    ChannelResponse {
        status: status_for(err),
        body: serde_json::to_value(Envelope::failure(ctx, err)).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use nexus_core::{ChannelKind, RequestId, Session};

    fn ctx() -> RequestContext {
        RequestContext {
            request_id: RequestId::new("req-1"),
            channel: ChannelKind::Http,
            session: Session::anonymous(ChannelKind::Http, Duration::seconds(60)),
            token: None,
            received_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_success_envelope_shape() {
        let envelope = Envelope::success(&ctx(), serde_json::json!({"echo": "hi"}));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["echo"], "hi");
        assert_eq!(json["metadata"]["request_id"], "req-1");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_envelope_carries_kind_and_correlation_id() {
        let err = NexusError::NotFound("workflow 'ghost'".to_string());
        let envelope = Envelope::failure(&ctx(), &err);
        assert!(!envelope.success);
        let body = envelope.error.unwrap();
        assert_eq!(body.kind, "not_found");
        assert!(body.message.contains("ghost"));
    }

    #[test]
    fn test_internal_errors_are_sanitized() {
        let err = NexusError::Internal("sqlx: connection refused at 10.0.0.3".to_string());
        let body = error_body(&err);
        assert_eq!(body.kind, "internal");
        assert!(!body.message.contains("10.0.0.3"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&NexusError::Validation("x".into())), 400);
        assert_eq!(status_for(&NexusError::Authentication("x".into())), 401);
        assert_eq!(status_for(&NexusError::authorization("r", "a", "x")), 403);
        assert_eq!(status_for(&NexusError::NotFound("x".into())), 404);
        assert_eq!(status_for(&NexusError::RateLimit { retry_after_ms: 1 }), 429);
        assert_eq!(status_for(&NexusError::execution("x")), 500);
    }

    #[test]
    fn test_rate_limit_hint_surfaces() {
        let body = error_body(&NexusError::RateLimit { retry_after_ms: 750 });
        assert_eq!(body.retry_after_ms, Some(750));
    }
}

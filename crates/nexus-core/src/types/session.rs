//! Session types.
//!
//! A session is a channel-independent identity record tied to an opaque
//! token. The same token resolves to the same session no matter which
//! channel presents it.

use super::{ChannelKind, SessionId, TenantId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// A gateway session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,

    /// Owning user. `None` for anonymous sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// Tenant scope. `None` for anonymous or tenant-less sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Channels that have used this session.
    #[serde(default)]
    pub channels: BTreeSet<ChannelKind>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Expiry timestamp.
    pub expires_at: DateTime<Utc>,

    /// Last activity timestamp.
    pub last_activity: DateTime<Utc>,

    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// Monotonic version counter, bumped on every mutation. Writers use
    /// compare-and-swap against this value.
    #[serde(default)]
    pub version: u64,

    /// Lifecycle state.
    #[serde(default)]
    pub state: SessionState,
}

impl Session {
    /// Create a new session for a user on a channel.
    pub fn new(
        user_id: Option<UserId>,
        tenant_id: Option<TenantId>,
        channel: ChannelKind,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let mut channels = BTreeSet::new();
        channels.insert(channel);
        Self {
            id: SessionId::generate(),
            user_id,
            tenant_id,
            channels,
            created_at: now,
            expires_at: now + ttl,
            last_activity: now,
            metadata: HashMap::new(),
            version: 0,
            state: SessionState::Active,
        }
    }

    /// Create an anonymous session (no user, no tenant).
    pub fn anonymous(channel: ChannelKind, ttl: Duration) -> Self {
        Self::new(None, None, channel, ttl)
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this session carries no user identity.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether the session has passed its expiry time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the session has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state != SessionState::Active
    }

    /// Record activity from a channel: grows the channel set, refreshes
    /// last-activity, bumps the version. Callers persist via CAS on the
    /// previous version.
    pub fn record_activity(&mut self, channel: ChannelKind, now: DateTime<Utc>) {
        self.channels.insert(channel);
        self.last_activity = now;
        self.version += 1;
    }
}

/// Session lifecycle state. `Expired` and `Revoked` are terminal; no
/// further touch succeeds once terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Live and usable from any channel.
    #[default]
    Active,

    /// Removed by the expiry sweep.
    Expired,

    /// Explicitly revoked.
    Revoked,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttl() -> Duration {
        Duration::seconds(3600)
    }

    #[test]
    fn test_session_new() {
        let session = Session::new(
            Some(UserId::new("alice")),
            Some(TenantId::new("acme")),
            ChannelKind::Http,
            ttl(),
        );
        assert!(session.id.as_str().starts_with("sess-"));
        assert_eq!(session.user_id, Some(UserId::new("alice")));
        assert_eq!(session.tenant_id, Some(TenantId::new("acme")));
        assert!(session.channels.contains(&ChannelKind::Http));
        assert_eq!(session.version, 0);
        assert_eq!(session.state, SessionState::Active);
        assert!(!session.is_anonymous());
        assert!(session.expires_at > session.created_at);
    }

    #[test]
    fn test_anonymous_session() {
        let session = Session::anonymous(ChannelKind::Command, ttl());
        assert!(session.is_anonymous());
        assert!(session.tenant_id.is_none());
    }

    #[test]
    fn test_record_activity_grows_channel_set_and_bumps_version() {
        let mut session = Session::new(None, None, ChannelKind::Http, ttl());
        let now = Utc::now();
        session.record_activity(ChannelKind::Command, now);
        session.record_activity(ChannelKind::Command, now);

        assert!(session.channels.contains(&ChannelKind::Http));
        assert!(session.channels.contains(&ChannelKind::Command));
        assert_eq!(session.channels.len(), 2);
        assert_eq!(session.version, 2);
    }

    #[test]
    fn test_expiry_check() {
        let session = Session::anonymous(ChannelKind::Http, Duration::seconds(10));
        assert!(!session.is_expired_at(session.created_at));
        assert!(session.is_expired_at(session.created_at + Duration::seconds(11)));
    }

    #[test]
    fn test_terminal_states() {
        let mut session = Session::anonymous(ChannelKind::Http, ttl());
        assert!(!session.is_terminal());
        session.state = SessionState::Revoked;
        assert!(session.is_terminal());
        session.state = SessionState::Expired;
        assert!(session.is_terminal());
    }

    #[test]
    fn test_metadata_builder() {
        let session = Session::anonymous(ChannelKind::Http, ttl())
            .with_metadata("client", serde_json::json!("web-ui"));
        assert_eq!(
            session.metadata.get("client"),
            Some(&serde_json::json!("web-ui"))
        );
    }
}

//! Session store implementation.

use chrono::{DateTime, Duration, Utc};
use nexus_core::config::SessionsConfig;
use nexus_core::{
    id, ChannelKind, NexusError, Result, Session, SessionId, SessionState, TenantId, UserId,
};
use nexus_store::{SessionRecord, SessionRecords};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The session store component.
///
/// Owns all session records. Tokens are opaque to channels; only the
/// store knows how to map a token back to a session.
pub struct SessionStore {
    records: Arc<dyn SessionRecords>,
    ttl: Duration,
    touch_retries: u32,
}

impl SessionStore {
    /// Create a store over an injected records backend.
    pub fn new(records: Arc<dyn SessionRecords>, config: &SessionsConfig) -> Self {
        Self {
            records,
            ttl: Duration::seconds(config.ttl_secs as i64),
            touch_retries: config.touch_retries,
        }
    }

    /// Create a session for a user on a channel. Returns the session and
    /// the plaintext token; this is the only time the token is visible.
    pub async fn create(
        &self,
        user_id: Option<UserId>,
        tenant_id: Option<TenantId>,
        channel: ChannelKind,
        metadata: HashMap<String, Value>,
    ) -> Result<(Session, String)> {
        let mut session = Session::new(user_id, tenant_id, channel, self.ttl);
        session.metadata = metadata;

        let token = id::token();
        let record = SessionRecord {
            session: session.clone(),
            token_hash: id::sha256(&token),
        };
        self.records.insert(record).await?;

        info!(session_id = %session.id, channel = %channel, "session created");
        Ok((session, token))
    }

    /// Create an anonymous session (no user, no tenant) for public
    /// operations.
    pub async fn anonymous(&self, channel: ChannelKind) -> Result<(Session, String)> {
        self.create(None, None, channel, HashMap::new()).await
    }

    /// Resolve a token to its session. The lookup behaves identically
    /// from every channel. Returns `None` for unknown tokens and for
    /// sessions that are terminal or past expiry.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>> {
        let hash = id::sha256(token);
        let Some(session) = self.records.find_by_token_hash(&hash).await? else {
            return Ok(None);
        };

        if session.is_terminal() {
            return Ok(None);
        }
        if session.is_expired_at(Utc::now()) {
            // Lazily retire sessions the sweep has not reached yet.
            self.records
                .mark_state(&session.id, SessionState::Expired)
                .await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Fetch a session by id.
    pub async fn get(&self, id: &SessionId) -> Result<Session> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| NexusError::NotFound(format!("session '{id}'")))
    }

    /// Record channel activity on a session: grows the channel set,
    /// refreshes last-activity, bumps the version.
    ///
    /// Safe under concurrent touches from multiple channels: a writer that
    /// observes a stale version re-reads and retries instead of
    /// overwriting.
    pub async fn touch(&self, id: &SessionId, channel: ChannelKind) -> Result<Session> {
        for attempt in 0..self.touch_retries {
            let session = self.get(id).await?;
            if session.is_terminal() {
                return Err(NexusError::Authentication(format!(
                    "session '{id}' is {}",
                    if session.state == SessionState::Revoked {
                        "revoked"
                    } else {
                        "expired"
                    }
                )));
            }

            let expected = session.version;
            let mut updated = session;
            updated.record_activity(channel, Utc::now());

            if self.records.update(expected, updated.clone()).await? {
                return Ok(updated);
            }
            debug!(session_id = %id, attempt, "stale session version, retrying touch");
        }

        Err(NexusError::Internal(format!(
            "session '{id}' touch contention exceeded {} retries",
            self.touch_retries
        )))
    }

    /// Newest live session owned by a user, if any.
    pub async fn find_for_user(&self, user_id: &UserId) -> Result<Option<Session>> {
        let now = Utc::now();
        let mut live: Vec<Session> = self
            .records
            .list()
            .await?
            .into_iter()
            .filter(|s| s.user_id.as_ref() == Some(user_id))
            .filter(|s| !s.is_terminal() && !s.is_expired_at(now))
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(live.into_iter().next())
    }

    /// Explicitly revoke a session. Terminal; no further touch succeeds.
    pub async fn revoke(&self, id: &SessionId) -> Result<bool> {
        let revoked = self.records.mark_state(id, SessionState::Revoked).await?;
        if revoked {
            info!(session_id = %id, "session revoked");
        }
        Ok(revoked)
    }

    /// Mark every session past its expiry as `Expired`. Idempotent and
    /// safe to run concurrently with lookups. Returns how many sessions
    /// were retired.
    pub async fn expire_sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut swept = 0;
        for session in self.records.list().await? {
            if !session.is_terminal() && session.is_expired_at(now) {
                if self
                    .records
                    .mark_state(&session.id, SessionState::Expired)
                    .await?
                {
                    swept += 1;
                }
            }
        }
        if swept > 0 {
            debug!(swept, "expiry sweep retired sessions");
        }
        Ok(swept)
    }
}

/// Spawn the periodic expiry sweep loop.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = store.expire_sweep(Utc::now()).await {
                warn!("expiry sweep failed: {e}");
            }
        }
    })
}

//! The security manager.

use crate::authorizer::{AuthorizationStrategy, HybridStrategy, StrategyDecision, Subject};
use crate::principal::PrincipalRegistry;
use crate::rate_limit::RateLimiter;
use nexus_core::config::SecurityConfig;
use nexus_core::id::TOKEN_PREFIX;
use nexus_core::{
    AuthDecision, ChannelKind, NexusError, RequestId, Result, Session, TenantId, UserId,
};
use nexus_sessions::SessionStore;
use nexus_store::AuditRecords;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Channel-specific credential shapes. All of them resolve to the same
/// [`Session`] type.
#[derive(Debug, Clone)]
pub enum Credentials<'a> {
    /// Bearer-style token: either an opaque session token or a configured
    /// principal token (HTTP header or stored command-line token).
    Bearer(&'a str),

    /// Signed tool-invocation request.
    Signed {
        key_id: &'a str,
        signature: &'a str,
        body: &'a str,
    },
}

/// Authentication, authorization, rate limiting, tenant isolation, and
/// audit emission, uniform across every channel.
pub struct SecurityManager {
    principals: PrincipalRegistry,
    strategy: Box<dyn AuthorizationStrategy>,
    rate_limiter: RateLimiter,
    audit: Arc<dyn AuditRecords>,
    sessions: Arc<SessionStore>,
    cross_tenant_grants: Vec<(UserId, TenantId)>,
}

impl SecurityManager {
    /// Create a manager with an explicit authorization strategy.
    pub fn new(
        config: &SecurityConfig,
        strategy: Box<dyn AuthorizationStrategy>,
        audit: Arc<dyn AuditRecords>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let cross_tenant_grants = config
            .cross_tenant_grants
            .iter()
            .map(|g| (UserId::new(&g.user_id), TenantId::new(&g.tenant)))
            .collect();
        Self {
            principals: PrincipalRegistry::from_config(config),
            strategy,
            rate_limiter: RateLimiter::new(&config.rate_limit),
            audit,
            sessions,
            cross_tenant_grants,
        }
    }

    /// Create a manager with the standard hybrid strategy (roles, then
    /// attribute policy).
    pub fn standard(
        config: &SecurityConfig,
        audit: Arc<dyn AuditRecords>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self::new(config, Box::new(HybridStrategy::standard()), audit, sessions)
    }

    /// Authenticate channel credentials into a session.
    ///
    /// Session tokens resolve to their existing session from any channel.
    /// Principal credentials reuse the principal's live session when one
    /// exists and create one on first authenticated contact.
    pub async fn authenticate(
        &self,
        credentials: Credentials<'_>,
        channel: ChannelKind,
    ) -> Result<Session> {
        match credentials {
            Credentials::Bearer(token) if token.starts_with(TOKEN_PREFIX) => {
                let session = self
                    .sessions
                    .resolve(token)
                    .await?
                    .ok_or_else(|| {
                        NexusError::Authentication("unknown or expired session token".to_string())
                    })?;
                self.sessions.touch(&session.id, channel).await
            }
            Credentials::Bearer(token) => {
                let principal = self.principals.find_by_token(token).ok_or_else(|| {
                    NexusError::Authentication("invalid bearer token".to_string())
                })?;
                let (user_id, tenant_id) = (principal.user_id.clone(), principal.tenant_id.clone());
                self.session_for_principal(user_id, tenant_id, channel).await
            }
            Credentials::Signed {
                key_id,
                signature,
                body,
            } => {
                let principal = self
                    .principals
                    .verify_signature(key_id, body, signature)
                    .ok_or_else(|| {
                        NexusError::Authentication(format!(
                            "signature verification failed for key '{key_id}'"
                        ))
                    })?;
                let (user_id, tenant_id) = (principal.user_id.clone(), principal.tenant_id.clone());
                self.session_for_principal(user_id, tenant_id, channel).await
            }
        }
    }

    /// Explicit login: authenticate principal credentials and mint a fresh
    /// session, returning it together with its plaintext token.
    pub async fn login(
        &self,
        credentials: Credentials<'_>,
        channel: ChannelKind,
    ) -> Result<(Session, String)> {
        let principal = match credentials {
            Credentials::Bearer(token) => self.principals.find_by_token(token),
            Credentials::Signed {
                key_id,
                signature,
                body,
            } => self.principals.verify_signature(key_id, body, signature),
        }
        .ok_or_else(|| NexusError::Authentication("invalid credentials".to_string()))?;

        let (session, token) = self
            .sessions
            .create(
                Some(principal.user_id.clone()),
                principal.tenant_id.clone(),
                channel,
                HashMap::new(),
            )
            .await?;
        info!(session_id = %session.id, user = %session.user_id.as_ref().map(|u| u.as_str()).unwrap_or("-"), "login");
        Ok((session, token))
    }

    /// Check the sliding-window rate limit for (session, channel).
    pub fn rate_limit(&self, session: &Session, channel: ChannelKind) -> Result<()> {
        self.rate_limiter
            .check(&session.id, channel)
            .map_err(|retry_after_ms| NexusError::RateLimit { retry_after_ms })
    }

    /// Authorize (session, resource, action). Every decision, allow or
    /// deny, produces an audit record.
    pub async fn authorize(
        &self,
        session: &Session,
        resource: &str,
        action: &str,
        channel: ChannelKind,
        request_id: &RequestId,
    ) -> Result<()> {
        let permissions = match &session.user_id {
            Some(user_id) => self.principals.permissions_for_user(user_id),
            None => Vec::new(),
        };
        let subject = Subject {
            session,
            permissions: &permissions,
        };

        let decision = self.strategy.authorize(&subject, resource, action);
        match decision {
            StrategyDecision::Allow(reason) => {
                self.record(
                    AuthDecision::allow(session.id.clone(), resource, action, reason)
                        .with_tenant(session.tenant_id.clone())
                        .with_channel(channel)
                        .with_request(request_id.clone()),
                )
                .await;
                debug!(session_id = %session.id, resource, action, "authorized");
                Ok(())
            }
            denied => {
                let reason = match denied {
                    StrategyDecision::Deny(reason) => reason,
                    _ => format!("no strategy grants '{action}' on '{resource}'"),
                };
                self.record(
                    AuthDecision::deny(session.id.clone(), resource, action, reason.clone())
                        .with_tenant(session.tenant_id.clone())
                        .with_channel(channel)
                        .with_request(request_id.clone()),
                )
                .await;
                info!(session_id = %session.id, resource, action, "authorization denied");
                Err(NexusError::authorization(resource, action, reason))
            }
        }
    }

    /// Enforce tenant isolation: the resource's tenant must equal the
    /// session's tenant, or the user must hold an explicit cross-tenant
    /// grant. A violation is a security incident: audited at elevated
    /// severity and logged louder than an ordinary denial.
    pub async fn enforce_tenant_isolation(
        &self,
        session: &Session,
        resource_tenant: Option<&TenantId>,
        resource: &str,
        channel: ChannelKind,
        request_id: &RequestId,
    ) -> Result<()> {
        let Some(resource_tenant) = resource_tenant else {
            // Tenant-less resources are not isolated.
            return Ok(());
        };

        if session.tenant_id.as_ref() == Some(resource_tenant) {
            return Ok(());
        }

        let has_grant = session.user_id.as_ref().is_some_and(|user| {
            self.cross_tenant_grants
                .iter()
                .any(|(u, t)| u == user && t == resource_tenant)
        });
        if has_grant {
            self.record(
                AuthDecision::allow(
                    session.id.clone(),
                    resource,
                    "cross_tenant",
                    format!("explicit cross-tenant grant into '{resource_tenant}'"),
                )
                .with_tenant(session.tenant_id.clone())
                .with_channel(channel)
                .with_request(request_id.clone()),
            )
            .await;
            return Ok(());
        }

        let session_tenant = session
            .tenant_id
            .as_ref()
            .map(|t| t.as_str())
            .unwrap_or("-");
        warn!(
            session_id = %session.id,
            session_tenant,
            resource_tenant = %resource_tenant,
            resource,
            "tenant isolation violation"
        );
        self.record(
            AuthDecision::deny(
                session.id.clone(),
                resource,
                "cross_tenant",
                format!(
                    "tenant isolation: session tenant '{session_tenant}' cannot reach tenant '{resource_tenant}'"
                ),
            )
            .with_tenant(session.tenant_id.clone())
            .with_channel(channel)
            .with_request(request_id.clone())
            .elevated(),
        )
        .await;

        Err(NexusError::authorization(
            resource,
            "execute",
            "tenant isolation violation",
        ))
    }

    /// Reuse the principal's live session if one exists (touching it with
    /// the contacting channel), otherwise create one: "first
    /// authenticated contact per (user, channel)".
    async fn session_for_principal(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
        channel: ChannelKind,
    ) -> Result<Session> {
        if let Some(existing) = self.sessions.find_for_user(&user_id).await? {
            return self.sessions.touch(&existing.id, channel).await;
        }
        let (session, _token) = self
            .sessions
            .create(Some(user_id), tenant_id, channel, HashMap::new())
            .await?;
        Ok(session)
    }

    async fn record(&self, decision: AuthDecision) {
        // Audit failures must not change the authorization outcome.
        if let Err(e) = self.audit.append(decision).await {
            warn!("failed to append audit record: {e}");
        }
    }
}

//! Per-tenant execution quotas.

use nexus_core::config::QuotaPolicy;
use nexus_core::{NexusError, Result, TenantId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Concurrency quota tracking, one semaphore per tenant. Tenant-less
/// sessions share a single bucket.
pub struct TenantQuotas {
    max_concurrent: usize,
    semaphores: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl TenantQuotas {
    /// Create quotas with the given per-tenant slot count.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            semaphores: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, tenant: Option<&TenantId>) -> Arc<Semaphore> {
        let key = tenant.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
        self.semaphores
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_concurrent)))
            .clone()
    }

    /// Try to take a slot immediately. Used by the `reject` quota policy:
    /// an exhausted quota is a rate-limit failure with a backoff hint.
    pub fn try_acquire(&self, tenant: Option<&TenantId>) -> Result<OwnedSemaphorePermit> {
        self.semaphore(tenant)
            .try_acquire_owned()
            .map_err(|_| NexusError::RateLimit {
                retry_after_ms: 1000,
            })
    }

    /// Wait for a slot. Used by the `queue` quota policy: the run stays
    /// queued until a slot frees.
    pub async fn acquire(&self, tenant: Option<&TenantId>) -> Result<OwnedSemaphorePermit> {
        self.semaphore(tenant)
            .acquire_owned()
            .await
            .map_err(|_| NexusError::Internal("quota semaphore closed".to_string()))
    }

    /// Acquire according to policy. `Reject` fails fast; `Queue` waits.
    pub async fn acquire_with_policy(
        &self,
        tenant: Option<&TenantId>,
        policy: QuotaPolicy,
    ) -> Result<OwnedSemaphorePermit> {
        match policy {
            QuotaPolicy::Reject => self.try_acquire(tenant),
            QuotaPolicy::Queue => self.acquire(tenant).await,
        }
    }
}

//! Versioned workflow registry.

use nexus_core::{NexusError, Result, TenantId, WorkflowHandle, WorkflowId};
use parking_lot::RwLock;
use semver::Version;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Registry of workflow handles, keyed by id and version.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<WorkflowId, BTreeMap<Version, WorkflowHandle>>>,
}

impl WorkflowRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle. A (id, version) pair may only be registered once.
    pub fn register(&self, handle: WorkflowHandle) -> Result<()> {
        let mut workflows = self.workflows.write();
        let versions = workflows.entry(handle.id.clone()).or_default();
        if versions.contains_key(&handle.version) {
            return Err(NexusError::Validation(format!(
                "workflow '{}' version {} is already registered",
                handle.id, handle.version
            )));
        }
        debug!(workflow = %handle.id, version = %handle.version, "workflow registered");
        versions.insert(handle.version.clone(), handle);
        Ok(())
    }

    /// Resolve a workflow handle. Without a version, the highest
    /// registered version wins.
    pub fn resolve(&self, id: &WorkflowId, version: Option<&Version>) -> Result<WorkflowHandle> {
        let workflows = self.workflows.read();
        let versions = workflows
            .get(id)
            .ok_or_else(|| NexusError::NotFound(format!("workflow '{id}'")))?;

        match version {
            Some(version) => versions.get(version).cloned().ok_or_else(|| {
                NexusError::NotFound(format!("workflow '{id}' version {version}"))
            }),
            None => versions
                .last_key_value()
                .map(|(_, handle)| handle.clone())
                .ok_or_else(|| NexusError::NotFound(format!("workflow '{id}'"))),
        }
    }

    /// Latest version of every workflow visible to a tenant: tenant-less
    /// workflows plus the tenant's own.
    pub fn list(&self, tenant: Option<&TenantId>) -> Vec<WorkflowHandle> {
        let workflows = self.workflows.read();
        let mut visible: Vec<WorkflowHandle> = workflows
            .values()
            .filter_map(|versions| versions.last_key_value().map(|(_, h)| h.clone()))
            .filter(|handle| match &handle.tenant_id {
                None => true,
                Some(owner) => tenant == Some(owner),
            })
            .collect();
        visible.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::InputSchema;

    fn handle(id: &str, version: Version) -> WorkflowHandle {
        WorkflowHandle::new(id, version, InputSchema::empty(), "workflow:execute")
    }

    #[test]
    fn test_register_and_resolve_latest() {
        let registry = WorkflowRegistry::new();
        registry.register(handle("w1", Version::new(1, 0, 0))).unwrap();
        registry.register(handle("w1", Version::new(1, 2, 0))).unwrap();
        registry.register(handle("w1", Version::new(1, 1, 0))).unwrap();

        let latest = registry.resolve(&WorkflowId::new("w1"), None).unwrap();
        assert_eq!(latest.version, Version::new(1, 2, 0));

        let pinned = registry
            .resolve(&WorkflowId::new("w1"), Some(&Version::new(1, 0, 0)))
            .unwrap();
        assert_eq!(pinned.version, Version::new(1, 0, 0));
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let registry = WorkflowRegistry::new();
        let err = registry.resolve(&WorkflowId::new("ghost"), None).unwrap_err();
        assert!(matches!(err, NexusError::NotFound(_)));

        registry.register(handle("w1", Version::new(1, 0, 0))).unwrap();
        let err = registry
            .resolve(&WorkflowId::new("w1"), Some(&Version::new(9, 9, 9)))
            .unwrap_err();
        assert!(matches!(err, NexusError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let registry = WorkflowRegistry::new();
        registry.register(handle("w1", Version::new(1, 0, 0))).unwrap();
        let err = registry
            .register(handle("w1", Version::new(1, 0, 0)))
            .unwrap_err();
        assert!(matches!(err, NexusError::Validation(_)));
    }

    #[test]
    fn test_list_respects_tenant_visibility() {
        let registry = WorkflowRegistry::new();
        registry.register(handle("public", Version::new(1, 0, 0))).unwrap();
        registry
            .register(handle("acme-only", Version::new(1, 0, 0)).with_tenant(TenantId::new("acme")))
            .unwrap();

        let acme = TenantId::new("acme");
        let globex = TenantId::new("globex");

        let for_acme = registry.list(Some(&acme));
        assert_eq!(for_acme.len(), 2);

        let for_globex = registry.list(Some(&globex));
        assert_eq!(for_globex.len(), 1);
        assert_eq!(for_globex[0].id, WorkflowId::new("public"));

        let anonymous = registry.list(None);
        assert_eq!(anonymous.len(), 1);
    }
}

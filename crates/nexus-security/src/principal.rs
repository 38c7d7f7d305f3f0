//! Configured principals and credential lookup.

use nexus_core::config::SecurityConfig;
use nexus_core::{id, TenantId, UserId};
use std::collections::HashMap;

/// A configured principal: the identity behind a credential.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Configured name (also the key id for signed requests).
    pub name: String,

    /// User identifier.
    pub user_id: UserId,

    /// Tenant the principal belongs to.
    pub tenant_id: Option<TenantId>,

    /// Granted roles.
    pub roles: Vec<String>,

    /// Hex SHA-256 of the principal's bearer token.
    token_sha256: Option<String>,

    /// Shared secret for signed requests.
    signing_key: Option<String>,
}

/// Registry of principals built from configuration.
#[derive(Debug, Default)]
pub struct PrincipalRegistry {
    by_name: HashMap<String, Principal>,
    by_token_hash: HashMap<String, String>,
    role_permissions: HashMap<String, Vec<String>>,
}

impl PrincipalRegistry {
    /// Build the registry from the security config section.
    pub fn from_config(config: &SecurityConfig) -> Self {
        let mut by_name = HashMap::new();
        let mut by_token_hash = HashMap::new();

        for (name, pc) in &config.principals {
            let principal = Principal {
                name: name.clone(),
                user_id: UserId::new(&pc.user_id),
                tenant_id: pc.tenant.as_deref().map(TenantId::new),
                roles: pc.roles.clone(),
                token_sha256: pc.token_sha256.clone(),
                signing_key: pc.signing_key.clone(),
            };
            if let Some(hash) = &principal.token_sha256 {
                by_token_hash.insert(hash.clone(), name.clone());
            }
            by_name.insert(name.clone(), principal);
        }

        Self {
            by_name,
            by_token_hash,
            role_permissions: config.roles.clone(),
        }
    }

    /// Look up a principal by bearer token.
    pub fn find_by_token(&self, token: &str) -> Option<&Principal> {
        let hash = id::sha256(token);
        let name = self.by_token_hash.get(&hash)?;
        self.by_name.get(name)
    }

    /// Look up a principal by key id (signed tool-invocation requests).
    pub fn find_by_key_id(&self, key_id: &str) -> Option<&Principal> {
        self.by_name
            .get(key_id)
            .filter(|p| p.signing_key.is_some())
    }

    /// Verify a request signature for a key id. The signature is hex
    /// SHA-256 over the signing key concatenated with the request body.
    pub fn verify_signature(&self, key_id: &str, body: &str, signature: &str) -> Option<&Principal> {
        let principal = self.find_by_key_id(key_id)?;
        let key = principal.signing_key.as_deref()?;
        let expected = id::sha256(&format!("{key}{body}"));
        if expected == signature {
            Some(principal)
        } else {
            None
        }
    }

    /// Permission strings granted to a principal through its roles.
    pub fn permissions_for(&self, principal: &Principal) -> Vec<String> {
        principal
            .roles
            .iter()
            .filter_map(|role| self.role_permissions.get(role))
            .flatten()
            .cloned()
            .collect()
    }

    /// Permission strings for a user id, across all principals that map
    /// to it.
    pub fn permissions_for_user(&self, user_id: &UserId) -> Vec<String> {
        self.by_name
            .values()
            .filter(|p| &p.user_id == user_id)
            .flat_map(|p| self.permissions_for(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::config::PrincipalConfig;

    fn config() -> SecurityConfig {
        let mut config = SecurityConfig::default();
        config.roles.insert(
            "operator".to_string(),
            vec!["workflow:execute".to_string(), "run:cancel".to_string()],
        );
        config.principals.insert(
            "alice".to_string(),
            PrincipalConfig {
                user_id: "alice".to_string(),
                tenant: Some("acme".to_string()),
                roles: vec!["operator".to_string()],
                token_sha256: Some(id::sha256("alice-token")),
                signing_key: Some("alice-secret".to_string()),
            },
        );
        config
    }

    #[test]
    fn test_find_by_token() {
        let registry = PrincipalRegistry::from_config(&config());
        let principal = registry.find_by_token("alice-token").unwrap();
        assert_eq!(principal.user_id, UserId::new("alice"));
        assert_eq!(principal.tenant_id, Some(TenantId::new("acme")));
        assert!(registry.find_by_token("wrong-token").is_none());
    }

    #[test]
    fn test_verify_signature() {
        let registry = PrincipalRegistry::from_config(&config());
        let body = r#"{"tool":"echo"}"#;
        let signature = id::sha256(&format!("alice-secret{body}"));

        assert!(registry.verify_signature("alice", body, &signature).is_some());
        assert!(registry.verify_signature("alice", body, "bad").is_none());
        assert!(registry.verify_signature("bob", body, &signature).is_none());
    }

    #[test]
    fn test_permissions_resolved_through_roles() {
        let registry = PrincipalRegistry::from_config(&config());
        let perms = registry.permissions_for_user(&UserId::new("alice"));
        assert!(perms.contains(&"workflow:execute".to_string()));
        assert!(perms.contains(&"run:cancel".to_string()));
        assert!(registry.permissions_for_user(&UserId::new("bob")).is_empty());
    }
}

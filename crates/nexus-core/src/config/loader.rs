//! Configuration loading and persistence.

use super::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Default configuration file path (`<config dir>/nexus/config.json5`).
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or_else(|| {
            ConfigError::Parse("could not determine user config directory".to_string())
        })?;
        Ok(base.join("nexus").join("config.json5"))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 doesn't have a serializer, so we use serde_json with pretty print
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.gateway.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        if self.sessions.ttl_secs == 0 {
            errors.push("Session TTL must be greater than 0".to_string());
        }

        if self.security.rate_limit.window_secs == 0 {
            errors.push("Rate limit window must be greater than 0".to_string());
        }
        if self.security.rate_limit.max_requests == 0 {
            errors.push("Rate limit max_requests must be greater than 0".to_string());
        }

        if self.executor.max_concurrent_per_tenant == 0 {
            errors.push("Executor max_concurrent_per_tenant must be greater than 0".to_string());
        }

        if self.events.queue_capacity == 0 {
            errors.push("Events queue_capacity must be greater than 0".to_string());
        }

        // Principal roles must reference defined roles
        for (name, principal) in &self.security.principals {
            for role in &principal.roles {
                if !self.security.roles.contains_key(role) {
                    errors.push(format!(
                        "Principal '{}' references undefined role '{}'",
                        name, role
                    ));
                }
            }
            if principal.token_sha256.is_none() && principal.signing_key.is_none() {
                errors.push(format!(
                    "Principal '{}' has neither token_sha256 nor signing_key",
                    name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

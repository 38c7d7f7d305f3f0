//! Event type patterns.

use nexus_core::{NexusError, Result};

/// A compiled subscription pattern: a literal event type or a trailing
/// wildcard over a dot-separated prefix. Compiled once at registration and
/// reused for every published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPattern {
    /// Exact match, e.g. `resource.created`.
    Literal(String),

    /// Trailing wildcard, e.g. `resource.*`, stored as the prefix
    /// `resource.`. The bare pattern `*` compiles to an empty prefix and
    /// matches everything.
    Prefix(String),
}

impl EventPattern {
    /// Compile a pattern string. Wildcards are only valid as the entire
    /// pattern (`*`) or as the trailing segment (`head.*`).
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(NexusError::Validation("empty event pattern".to_string()));
        }

        if pattern == "*" {
            return Ok(Self::Prefix(String::new()));
        }

        if let Some(head) = pattern.strip_suffix(".*") {
            if head.is_empty() || head.contains('*') {
                return Err(NexusError::Validation(format!(
                    "invalid event pattern '{pattern}': wildcard must be the trailing segment"
                )));
            }
            return Ok(Self::Prefix(format!("{head}.")));
        }

        if pattern.contains('*') {
            return Err(NexusError::Validation(format!(
                "invalid event pattern '{pattern}': wildcard must be the trailing segment"
            )));
        }

        Ok(Self::Literal(pattern.to_string()))
    }

    /// Test an event type against the compiled pattern.
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == event_type,
            Self::Prefix(prefix) => event_type.starts_with(prefix.as_str()),
        }
    }
}

impl std::fmt::Display for EventPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

//! Channel types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol-specific entry points sharing the gateway's session, event,
/// and execution services.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// HTTP request/response protocol.
    Http,

    /// Command protocol (CLI callers).
    Command,

    /// Tool-invocation protocol (programmatic/agent callers).
    Tool,
}

impl ChannelKind {
    /// Stable string form used in tokens, keys, and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Command => "command",
            Self::Tool => "tool",
        }
    }

    /// All channel kinds, in detection priority order.
    pub fn all() -> &'static [ChannelKind] {
        &[Self::Command, Self::Tool, Self::Http]
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "command" => Ok(Self::Command),
            "tool" => Ok(Self::Tool),
            other => Err(format!("unknown channel kind: {other}")),
        }
    }
}

/// Static description of an operation a channel exposes. Used by the
/// tool-invocation channel for discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Operation name (e.g. `workflow.execute`).
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// JSON-schema-shaped description of the inputs map.
    pub input_schema: serde_json::Value,
}

impl OperationDescriptor {
    /// Create a new descriptor.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_channel_kind_roundtrip() {
        for kind in ChannelKind::all() {
            let parsed = ChannelKind::from_str(kind.as_str()).unwrap();
            assert_eq!(parsed, *kind);
        }
        assert!(ChannelKind::from_str("websocket").is_err());
    }

    #[test]
    fn test_channel_kind_serde() {
        let json = serde_json::to_string(&ChannelKind::Tool).unwrap();
        assert_eq!(json, "\"tool\"");
    }

    #[test]
    fn test_detection_priority_order() {
        // Command and tool prefixes are claimed before the HTTP default.
        assert_eq!(
            ChannelKind::all(),
            &[ChannelKind::Command, ChannelKind::Tool, ChannelKind::Http]
        );
    }
}

//! Command-protocol client.

use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use std::path::PathBuf;

/// HTTP client speaking the gateway's command protocol.
pub struct GatewayClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Create a client. An explicitly supplied token wins over the stored
    /// one.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let token = token.or_else(load_stored_token);
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    /// Whether the client has a credential to present.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Send a command with named options and return the envelope's data.
    pub async fn command(&self, command: &str, options: Value) -> anyhow::Result<Value> {
        let url = format!("{}/cmd/{}", self.base_url, command);
        let mut request = self.http.post(&url).json(&serde_json::json!({
            "options": options,
        }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("gateway unreachable at {}", self.base_url))?;
        let envelope: Value = response
            .json()
            .await
            .context("gateway returned a non-JSON response")?;

        if envelope["success"].as_bool().unwrap_or(false) {
            return Ok(envelope["data"].clone());
        }

        let kind = envelope["error"]["kind"].as_str().unwrap_or("unknown");
        let message = envelope["error"]["message"]
            .as_str()
            .unwrap_or("request failed");
        let request_id = envelope["metadata"]["request_id"].as_str().unwrap_or("-");
        bail!("{kind}: {message} (request {request_id})");
    }
}

/// Stored-token path: `<config dir>/nexus/token`.
pub fn token_path() -> anyhow::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("no user config directory"))?;
    Ok(base.join("nexus").join("token"))
}

/// Read the stored token, if any.
pub fn load_stored_token() -> Option<String> {
    let path = token_path().ok()?;
    let token = std::fs::read_to_string(path).ok()?;
    let token = token.trim().to_string();
    (!token.is_empty()).then_some(token)
}

/// Persist a token for later commands.
pub fn store_token(token: &str) -> anyhow::Result<()> {
    let path = token_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, token)?;
    Ok(())
}

//! Identifier and token generation utilities.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Prefix for opaque session tokens.
pub const TOKEN_PREFIX: &str = "nxs_";

/// Generate a new UUID v4.
pub fn uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a short random ID (8 hex characters).
pub fn short_id() -> String {
    let bytes: [u8; 4] = rand::random();
    hex::encode(bytes)
}

/// Generate an opaque session token: `nxs_` followed by URL-safe base64 of
/// 32 random bytes. Channels treat the whole string as opaque.
pub fn token() -> String {
    let bytes: [u8; 32] = rand::random();
    let encoded =
        base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes);
    format!("{TOKEN_PREFIX}{encoded}")
}

/// Generate a SHA256 hash of the input, hex-encoded.
pub fn sha256(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check if an ID is valid (alphanumeric, underscores, dashes, dots).
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

//! Cross-channel session store.
//!
//! Sessions are channel-independent: a token handed out on one channel
//! resolves to the same session on every other channel. All mutation goes
//! through versioned compare-and-swap against the injected
//! [`nexus_store::SessionRecords`] backend.

mod store;

pub use store::{spawn_sweeper, SessionStore};

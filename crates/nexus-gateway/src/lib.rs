//! Unified orchestration gateway core.
//!
//! This crate composes the Nexus components into one gateway:
//!
//! - Channel detection over a fixed-priority adapter list
//! - Request-context construction (session resolution, rate limit, authn)
//! - The three channel adapters (HTTP request/response, command,
//!   tool-invocation) translating their protocols into one internal call
//! - Event push streaming over WebSocket
//! - The axum server binding it all to a socket

pub mod channels;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod server;
pub mod stream;

pub use channels::{ChannelAdapter, InboundMessage};
pub use context::RequestContext;
pub use dispatch::{Dispatcher, GatewayServices};
pub use envelope::{ChannelResponse, Envelope};
pub use server::Gateway;

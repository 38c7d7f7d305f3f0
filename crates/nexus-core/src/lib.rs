//! # nexus-core
//!
//! Core types, configuration, and utilities for the Nexus gateway.
//!
//! This crate provides shared functionality used across all Nexus crates:
//!
//! - **Types**: sessions, events, workflow handles, execution runs, and
//!   audit decisions shared by every channel
//! - **Errors**: the unified error taxonomy surfaced at channel boundaries
//! - **Configuration**: loading, validation, and management of config files
//! - **Utilities**: identifier and token generation

pub mod config;
pub mod error;
pub mod id;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{NexusError, Result};
pub use types::*;

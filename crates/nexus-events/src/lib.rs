//! Pattern-based publish/subscribe fan-out across channels.
//!
//! Subscriptions compile their type pattern once at registration. Each
//! subscriber gets its own ordered queue, so delivery to one subscriber
//! never blocks or fails delivery to another, and a single subscriber
//! always observes events in publish order.

mod pattern;
mod router;

pub use pattern::EventPattern;
pub use router::{DeliveryError, EventRouter, EventSink, PublishReceipt, RouterStats};

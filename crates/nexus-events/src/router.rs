//! Event router: subscription registry and fan-out.

use crate::pattern::EventPattern;
use async_trait::async_trait;
use nexus_core::{DeliveryMode, NexusEvent, Result, SubscriptionId, TenantId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Error returned by a sink that failed to deliver an event.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// A live subscriber endpoint on some channel.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Push one event to the subscriber.
    async fn deliver(&self, event: Arc<NexusEvent>) -> std::result::Result<(), DeliveryError>;
}

/// Outcome of a publish call.
#[derive(Debug, Clone, Copy)]
pub struct PublishReceipt {
    /// Number of subscriptions the event matched.
    pub matched: usize,

    /// Number of subscriber queues the event was placed on.
    pub enqueued: usize,

    /// Delivery mode the publish requested.
    pub mode: DeliveryMode,
}

/// Router delivery counters, exposed by the gateway health endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterStats {
    /// Events handed to sinks successfully.
    pub delivered: u64,

    /// Events dropped (dead subscriber, full queue, failed retry).
    pub dropped: u64,
}

struct SubscriptionEntry {
    pattern: EventPattern,
    tenant_filter: Option<TenantId>,
    tx: mpsc::Sender<Arc<NexusEvent>>,
    dead: Arc<AtomicBool>,
}

/// Pattern-based fan-out across channels.
///
/// Tenant scoping: an event carrying a tenant only matches subscriptions
/// registered with that same tenant filter; a tenant-less subscription
/// only sees tenant-less events. Delivery to each matched subscriber runs
/// on the subscriber's own queue/worker, so per-subscriber FIFO holds and
/// one subscriber's failure never affects another's delivery.
pub struct EventRouter {
    subscriptions: RwLock<HashMap<SubscriptionId, SubscriptionEntry>>,
    queue_capacity: usize,
    delivered: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl EventRouter {
    /// Create a router with the given per-subscriber queue capacity.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            queue_capacity,
            delivered: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a subscription. The pattern is compiled here, once, and
    /// reused for every published event. Returns a handle usable to
    /// unsubscribe.
    pub fn subscribe(
        &self,
        sink: Arc<dyn EventSink>,
        pattern: &str,
        tenant_filter: Option<TenantId>,
    ) -> Result<SubscriptionId> {
        let compiled = EventPattern::compile(pattern)?;
        let id = SubscriptionId::generate();
        let (tx, rx) = mpsc::channel::<Arc<NexusEvent>>(self.queue_capacity);
        let dead = Arc::new(AtomicBool::new(false));

        tokio::spawn(deliver_loop(
            id.clone(),
            sink,
            rx,
            dead.clone(),
            self.delivered.clone(),
            self.dropped.clone(),
        ));

        self.subscriptions.write().insert(
            id.clone(),
            SubscriptionEntry {
                pattern: compiled,
                tenant_filter,
                tx,
                dead,
            },
        );

        debug!(subscription = %id, pattern, "subscription registered");
        Ok(id)
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.write().remove(id).is_some()
    }

    /// Publish an event in the given delivery mode.
    ///
    /// Enqueueing is attempted independently per matched subscriber; a
    /// full or dead subscriber never blocks the others. For `Persistent`
    /// publishes a full queue counts the event as dropped for that
    /// subscriber only after a bounded wait; `Ephemeral` publishes never
    /// wait.
    pub async fn publish(&self, event: NexusEvent, mode: DeliveryMode) -> PublishReceipt {
        let event = Arc::new(event.with_delivery(mode));

        // Snapshot matching senders under the read lock, then enqueue
        // without holding it.
        let targets: Vec<(SubscriptionId, mpsc::Sender<Arc<NexusEvent>>)> = {
            let subs = self.subscriptions.read();
            subs.iter()
                .filter(|(_, entry)| !entry.dead.load(Ordering::Relaxed))
                .filter(|(_, entry)| entry.pattern.matches(&event.event_type))
                .filter(|(_, entry)| tenant_matches(&event.tenant_id, &entry.tenant_filter))
                .map(|(id, entry)| (id.clone(), entry.tx.clone()))
                .collect()
        };

        let matched = targets.len();
        let mut enqueued = 0;

        let sends = targets.into_iter().map(|(id, tx)| {
            let event = event.clone();
            async move {
                match mode {
                    DeliveryMode::Ephemeral => tx.try_send(event).is_ok(),
                    DeliveryMode::Persistent => {
                        // Bounded wait so one backed-up subscriber cannot
                        // stall the publisher indefinitely.
                        match tokio::time::timeout(
                            std::time::Duration::from_millis(500),
                            tx.send(event),
                        )
                        .await
                        {
                            Ok(Ok(())) => true,
                            _ => {
                                warn!(subscription = %id, "persistent enqueue failed");
                                false
                            }
                        }
                    }
                }
            }
        });

        for ok in futures::future::join_all(sends).await {
            if ok {
                enqueued += 1;
            } else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.prune_dead();

        PublishReceipt {
            matched,
            enqueued,
            mode,
        }
    }

    /// Current delivery counters.
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    fn prune_dead(&self) {
        let mut subs = self.subscriptions.write();
        subs.retain(|_, entry| !entry.dead.load(Ordering::Relaxed));
    }
}

fn tenant_matches(event_tenant: &Option<TenantId>, filter: &Option<TenantId>) -> bool {
    match event_tenant {
        // Tenant-less events are visible to tenant-less subscriptions only.
        None => filter.is_none(),
        // Tenant-scoped events never match outside their tenant,
        // regardless of pattern.
        Some(tenant) => filter.as_ref() == Some(tenant),
    }
}

/// Per-subscription delivery worker: drains the queue in order, applying
/// the event's delivery mode. Persistent events get one redelivery before
/// the subscriber is declared dead.
async fn deliver_loop(
    id: SubscriptionId,
    sink: Arc<dyn EventSink>,
    mut rx: mpsc::Receiver<Arc<NexusEvent>>,
    dead: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
) {
    while let Some(event) = rx.recv().await {
        match sink.deliver(event.clone()).await {
            Ok(()) => {
                delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(first) => match event.delivery {
                DeliveryMode::Ephemeral => {
                    debug!(subscription = %id, "ephemeral delivery failed: {first}");
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                DeliveryMode::Persistent => match sink.deliver(event).await {
                    Ok(()) => {
                        delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(second) => {
                        warn!(
                            subscription = %id,
                            "subscriber dropped after failed redelivery: {second}"
                        );
                        dropped.fetch_add(1, Ordering::Relaxed);
                        dead.store(true, Ordering::Relaxed);
                        return;
                    }
                },
            },
        }
    }
}

//! Event bus keyed by event references
//!
//! Handlers are registered under an [`EventRef`] and invoked for every
//! published event the reference matches. Delivery is synchronous from the
//! publisher's thread but each invocation is isolated: a panicking handler
//! is logged and skipped, it cannot take down the publisher or the
//! remaining handlers.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::reference::{ChangeEvent, EventKind, EventRef};

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Snapshot of delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Total events published
    pub events_published: u64,
    /// Total handler invocations that completed
    pub handlers_delivered: u64,
    /// Total handler invocations that panicked
    pub handlers_panicked: u64,
}

type Handler = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    reference: EventRef,
    handler: Handler,
}

/// Publish/subscribe registry keyed by [`EventRef`]
///
/// Shared via `Arc`; every method takes `&self`. No persistence or replay.
pub struct EventBus {
    subscriptions: RwLock<HashMap<EventKind, Vec<Subscription>>>,
    next_id: AtomicU64,
    events_published: AtomicU64,
    handlers_delivered: AtomicU64,
    handlers_panicked: AtomicU64,
}

impl EventBus {
    /// Create a new bus with no subscriptions
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events_published: AtomicU64::new(0),
            handlers_delivered: AtomicU64::new(0),
            handlers_panicked: AtomicU64::new(0),
        }
    }

    /// Subscribe a handler under the given reference
    pub fn subscribe<F>(&self, reference: EventRef, handler: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .entry(reference.kind)
            .or_default()
            .push(Subscription {
                id,
                reference,
                handler: Arc::new(handler),
            });
        log::debug!("subscribed {:?} to {}", id, reference);
        id
    }

    /// Subscribe a channel under the given reference
    ///
    /// Matching events are cloned into an unbounded channel; transport
    /// adapters drain the receiver at their own pace. Dropping the receiver
    /// silently discards further events until the handle is unsubscribed.
    pub fn subscribe_channel(
        &self,
        reference: EventRef,
    ) -> (SubscriptionId, crossbeam_channel::Receiver<ChangeEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let id = self.subscribe(reference, move |event| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }

    /// Remove a subscription; idempotent
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscriptions = self.subscriptions.write();
        for entries in subscriptions.values_mut() {
            entries.retain(|s| s.id != id);
        }
        subscriptions.retain(|_, entries| !entries.is_empty());
    }

    /// Publish an event to every matching handler
    ///
    /// Returns the number of handlers that received the event. Handlers run
    /// on the caller's thread, outside the registry lock, each isolated
    /// from the others' panics.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let matching: Vec<Handler> = {
            let subscriptions = self.subscriptions.read();
            subscriptions
                .get(&event.reference.kind)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|s| event.addressed_to(&s.reference))
                        .map(|s| Arc::clone(&s.handler))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut delivered = 0;
        for handler in matching {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => {
                    delivered += 1;
                    self.handlers_delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    self.handlers_panicked.fetch_add(1, Ordering::Relaxed);
                    log::warn!("event handler panicked while handling {}", event.reference);
                }
            }
        }
        delivered
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().values().map(|entries| entries.len()).sum()
    }

    /// Snapshot of delivery counters
    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            events_published: self.events_published.load(Ordering::Relaxed),
            handlers_delivered: self.handlers_delivered.load(Ordering::Relaxed),
            handlers_panicked: self.handlers_panicked.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

//! In-process event dispatcher.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::envelope::EventEnvelope;

/// A subscriber interested in one event kind.
///
/// Subscribers must be idempotent-friendly: a failure is logged and isolated,
/// never retried and never allowed to abort sibling deliveries or the commit
/// that produced the event.
pub trait EventSubscriber: Send + Sync {
    /// Human-readable name, used in failure logs.
    fn name(&self) -> &str;

    fn handle(&self, envelope: &EventEnvelope) -> anyhow::Result<()>;
}

/// Synchronous fan-out of committed events to per-kind subscribers.
///
/// Delivery is sequential and in collection order: envelopes in the order
/// they were drained from the staged aggregates, and for each envelope the
/// subscribers in registration order. Kinds with no subscribers are skipped
/// silently.
pub struct EventDispatcher {
    subscribers: RwLock<HashMap<String, Vec<Arc<dyn EventSubscriber>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for an event kind.
    pub fn subscribe(&self, kind: impl Into<String>, subscriber: Arc<dyn EventSubscriber>) {
        // If the lock is poisoned we drop the registration; deliveries keep
        // working off whatever was registered before the poisoning panic.
        if let Ok(mut subs) = self.subscribers.write() {
            subs.entry(kind.into()).or_default().push(subscriber);
        }
    }

    /// Deliver each envelope to every subscriber registered for its kind.
    pub fn dispatch(&self, envelopes: &[EventEnvelope]) {
        let subs = match self.subscribers.read() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::error!("event subscriber registry poisoned; dropping dispatch");
                return;
            }
        };
        for envelope in envelopes {
            let Some(for_kind) = subs.get(envelope.kind()) else {
                continue;
            };
            for subscriber in for_kind {
                if let Err(err) = subscriber.handle(envelope) {
                    tracing::warn!(
                        subscriber = subscriber.name(),
                        kind = envelope.kind(),
                        event_id = %envelope.event_id(),
                        error = %err,
                        "event subscriber failed; continuing"
                    );
                }
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }
}

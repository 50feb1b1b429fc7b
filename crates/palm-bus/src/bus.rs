//! The bus proper - topic table, atomic replace, and subscriptions

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::{Published, TopicId};

type Handler<P> = Arc<dyn Fn(&Published<P>) + Send + Sync>;

/// Per-topic storage: the latest value plus the notify list.
struct TopicSlot<P> {
    /// Latest published value. Held only for the atomic replace, never
    /// while handlers run, so handlers may read `latest` freely.
    latest: RwLock<Option<Published<P>>>,
    next_version: AtomicU64,
    handlers: RwLock<Vec<(u64, Handler<P>)>>,
    /// Serializes publishers so notification order matches version order.
    notify: Mutex<()>,
}

impl<P> TopicSlot<P> {
    fn new() -> Self {
        TopicSlot {
            latest: RwLock::new(None),
            next_version: AtomicU64::new(0),
            handlers: RwLock::new(Vec::new()),
            notify: Mutex::new(()),
        }
    }
}

/// In-process latest-value publish/subscribe bus.
///
/// Safe under concurrent publish from the engine and concurrent
/// subscribe/unsubscribe from observers. Handlers run on the publishing
/// thread with no payload lock held, so they may call [`EventBus::latest`];
/// they must not block, and must not publish to the topic they are
/// subscribed to.
pub struct EventBus<P> {
    topics: RwLock<HashMap<TopicId, Arc<TopicSlot<P>>>>,
    next_sub_id: AtomicU64,
}

impl<P: Clone + Send + Sync + 'static> EventBus<P> {
    pub fn new() -> Self {
        EventBus {
            topics: RwLock::new(HashMap::new()),
            next_sub_id: AtomicU64::new(0),
        }
    }

    fn slot(&self, topic: TopicId) -> Arc<TopicSlot<P>> {
        if let Some(slot) = self.topics.read().get(&topic) {
            return Arc::clone(slot);
        }
        let mut topics = self.topics.write();
        Arc::clone(topics.entry(topic).or_insert_with(|| Arc::new(TopicSlot::new())))
    }

    /// Publish a payload, replacing the topic's latest value.
    ///
    /// Subscribers are notified on this thread, in version order, after the
    /// replacement is visible to readers. Returns the assigned version.
    pub fn publish(&self, topic: TopicId, payload: P) -> u64 {
        let slot = self.slot(topic);

        // Taken before the version is assigned: a concurrent publisher
        // cannot overtake this notification pass, so subscribers observe
        // versions in non-decreasing order.
        let _order = slot.notify.lock();

        let version = slot.next_version.fetch_add(1, Ordering::Relaxed) + 1;
        let published = Published { version, payload };
        *slot.latest.write() = Some(published.clone());

        let handlers: Vec<Handler<P>> = slot
            .handlers
            .read()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(&published);
        }

        version
    }

    /// Latest value for a topic, if any was ever published.
    pub fn latest(&self, topic: TopicId) -> Option<Published<P>> {
        let slot = self.topics.read().get(&topic).map(Arc::clone)?;
        let latest = slot.latest.read();
        latest.clone()
    }

    /// Register a handler for a topic.
    ///
    /// The returned [`Subscription`] unsubscribes when dropped or via
    /// [`Subscription::unsubscribe`].
    pub fn subscribe<F>(&self, topic: TopicId, handler: F) -> Subscription<P>
    where
        F: Fn(&Published<P>) + Send + Sync + 'static,
    {
        let slot = self.slot(topic);
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        slot.handlers.write().push((id, Arc::new(handler)));

        Subscription {
            slot: Arc::downgrade(&slot),
            id,
        }
    }

    /// Total number of live subscriptions across all topics.
    ///
    /// Teardown observability: a destroyed engine leaves this at zero for
    /// its own topics.
    pub fn subscription_count(&self) -> usize {
        self.topics
            .read()
            .values()
            .map(|slot| slot.handlers.read().len())
            .sum()
    }
}

impl<P: Clone + Send + Sync + 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered handler; unsubscribes on drop.
pub struct Subscription<P> {
    slot: Weak<TopicSlot<P>>,
    id: u64,
}

impl<P> Subscription<P> {
    /// Remove the handler now. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(slot) = self.slot.upgrade() {
            slot.handlers.write().retain(|(id, _)| *id != self.id);
        }
        self.slot = Weak::new();
    }
}

impl<P> Drop for Subscription<P> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

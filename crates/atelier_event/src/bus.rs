//! Generic synchronous publish/subscribe bus
//!
//! [`Bus::emit`] calls every subscriber registered at the moment the
//! emission starts, on the caller's thread, before returning. Callbacks run
//! outside the registry lock, so they may subscribe or unsubscribe freely;
//! a callback added during an emission is first called by the next one.
//!
//! Delivery is not isolated: a panicking callback unwinds out of `emit` and
//! the remaining callbacks of that emission are skipped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// Subscriber callback
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

struct Registry<T: 'static> {
    subscribers: RwLock<Vec<(SubscriberId, Handler<T>)>>,
    next_subscriber_id: AtomicU64,
}

impl<T: 'static> Registry<T> {
    fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }
}

/// Publish/subscribe channel for events of type `T`.
///
/// Cloning a `Bus` yields another handle to the same subscriber set.
pub struct Bus<T: 'static> {
    registry: Arc<Registry<T>>,
}

impl<T: 'static> Bus<T> {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: RwLock::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `handler` for every future emission.
    ///
    /// The returned [`Subscription`] removes exactly this handler when it is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriberId(
            self.registry
                .next_subscriber_id
                .fetch_add(1, Ordering::Relaxed),
        );
        self.registry
            .subscribers
            .write()
            .push((id, Arc::new(handler)));

        let registry: Weak<Registry<T>> = Arc::downgrade(&self.registry);
        Subscription {
            id,
            cancel: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.remove(id);
                }
            })),
        }
    }

    /// Deliver `event` to the current subscriber set
    pub fn emit(&self, event: &T) {
        let handlers: Vec<Handler<T>> = self
            .registry
            .subscribers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    /// Remove a subscriber by id. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.remove(id)
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.read().len()
    }

    /// Check if nobody is listening
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

impl<T: 'static> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: 'static> Default for Bus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Bus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Unsubscribe capability returned by [`Bus::subscribe`].
///
/// Dropping the guard unsubscribes. Call [`detach`](Self::detach) to keep
/// the callback registered for as long as the bus lives.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    id: SubscriberId,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// The subscriber id on its bus
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the callback now
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered without holding the guard
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}

//! Property mutation notifications
//!
//! Every edit to a node emits one [`MutationEvent`] carrying the node and the
//! most specific property path that changed. Observers register interest in
//! a `(target, path)` pair and are called when an event touches that pair.
//!
//! # Path granularity
//!
//! Emitters never emit a parent path on top of a leaf path. Instead,
//! [`MutationNotifier::observe`] matches on *overlap*: an observer of
//! `"position"` hears `"position.x"`, an observer of `"position.x"` hears a
//! wholesale `"position"` write, and neither hears `"rotation"`. Use
//! [`MutationNotifier::observe_exact`] for strict equality.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use atelier_core::{NodeId, PropertyPath};

use crate::bus::{Bus, Subscription};

/// "This node's property changed"
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MutationEvent {
    /// Node that was edited
    pub target: NodeId,
    /// Most specific path that changed
    pub path: PropertyPath,
}

impl MutationEvent {
    /// Create a new event
    pub fn new(target: NodeId, path: impl Into<PropertyPath>) -> Self {
        Self {
            target,
            path: path.into(),
        }
    }

    /// Whether a value read at `(target, path)` may have changed
    pub fn affects(&self, target: NodeId, path: &PropertyPath) -> bool {
        self.target == target && self.path.overlaps(path)
    }
}

/// Editor-wide mutation channel.
///
/// Cheap to clone; all clones share one subscriber set.
#[derive(Clone, Debug, Default)]
pub struct MutationNotifier {
    bus: Bus<MutationEvent>,
}

impl MutationNotifier {
    /// Create a notifier with no observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a mutation of `path` on `target`
    pub fn notify(&self, target: NodeId, path: impl Into<PropertyPath>) {
        let event = MutationEvent::new(target, path);
        log::trace!("mutation {} {}", event.target, event.path);
        self.bus.emit(&event);
    }

    /// Emit a prepared event
    pub fn emit(&self, event: &MutationEvent) {
        self.bus.emit(event);
    }

    /// Receive every mutation
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(handler)
    }

    /// Receive mutations whose path overlaps `path` on `target`
    pub fn observe<F>(&self, target: NodeId, path: impl Into<PropertyPath>, handler: F) -> Subscription
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        let path = path.into();
        self.bus.subscribe(move |event: &MutationEvent| {
            if event.affects(target, &path) {
                handler(event);
            }
        })
    }

    /// Receive mutations of exactly `path` on `target`
    pub fn observe_exact<F>(
        &self,
        target: NodeId,
        path: impl Into<PropertyPath>,
        handler: F,
    ) -> Subscription
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        let path = path.into();
        self.bus.subscribe(move |event: &MutationEvent| {
            if event.target == target && event.path == path {
                handler(event);
            }
        })
    }

    /// Create a [`Watch`] over `(target, path)`
    pub fn watch(&self, target: NodeId, path: impl Into<PropertyPath>) -> Watch {
        let state = Arc::new(WatchState {
            dirty: AtomicBool::new(true),
            revision: AtomicU64::new(0),
        });
        let observed = Arc::clone(&state);
        let subscription = self.observe(target, path, move |_| {
            observed.revision.fetch_add(1, Ordering::Relaxed);
            observed.dirty.store(true, Ordering::Release);
        });
        Watch {
            state,
            _subscription: subscription,
        }
    }

    /// The underlying bus
    pub fn bus(&self) -> &Bus<MutationEvent> {
        &self.bus
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}

struct WatchState {
    dirty: AtomicBool,
    revision: AtomicU64,
}

/// Re-render trigger for one `(target, path)` pair.
///
/// Starts dirty so the first frame renders. Dropping the watch stops
/// observing.
pub struct Watch {
    state: Arc<WatchState>,
    _subscription: Subscription,
}

impl Watch {
    /// Return and clear the dirty flag
    pub fn take_dirty(&self) -> bool {
        self.state.dirty.swap(false, Ordering::AcqRel)
    }

    /// Peek at the dirty flag
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.load(Ordering::Acquire)
    }

    /// Number of matching mutations seen so far
    pub fn revision(&self) -> u64 {
        self.state.revision.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Watch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch")
            .field("dirty", &self.is_dirty())
            .field("revision", &self.revision())
            .finish()
    }
}

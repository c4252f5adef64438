//! # atelier_event - Mutation Notification Bus
//!
//! Synchronous publish/subscribe plumbing that lets independent UI fragments
//! react to edits without polling and without a central coordinator:
//! - [`Bus`]: generic, cloneable publish/subscribe channel
//! - [`Subscription`]: guard returned by `subscribe`, removes its callback
//! - [`MutationNotifier`]: a `Bus<MutationEvent>` with path-aware observers
//! - [`Watch`]: dirty flag for immediate-mode panels
//!
//! There is no global bus. Each editor session owns its notifier and hands
//! clones of it to whoever needs to emit or observe.
//!
//! ## Example
//!
//! ```ignore
//! let notifier = MutationNotifier::new();
//! let _sub = notifier.observe(node, "position", |event| {
//!     log::info!("{} changed at {}", event.target, event.path);
//! });
//! notifier.notify(node, "position.x");
//! ```

pub mod bus;
pub mod mutation;

pub use bus::{Bus, SubscriberId, Subscription};
pub use mutation::{MutationEvent, MutationNotifier, Watch};

/// Prelude
pub mod prelude {
    pub use crate::bus::{Bus, SubscriberId, Subscription};
    pub use crate::mutation::{MutationEvent, MutationNotifier, Watch};
}

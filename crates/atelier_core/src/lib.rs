//! # atelier_core - Editor Core Primitives
//!
//! The small vocabulary every other Atelier crate speaks:
//! - [`NodeId`]: a stable handle to a scene node. Handles are never reused,
//!   so a command holding one stays valid across any structural edit.
//! - [`IdAllocator`]: thread-safe, monotonic handle generation.
//! - [`PropertyPath`]: a dotted path (`"position.x"`) naming one property of
//!   a node, used both to read/write values and to address mutation events.

pub mod id;
pub mod path;

pub use id::{IdAllocator, NodeId};
pub use path::PropertyPath;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::id::{IdAllocator, NodeId};
    pub use crate::path::PropertyPath;
}

//! Stable node identifiers

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

/// Handle to a node in a scene graph.
///
/// Ids are handed out monotonically and never recycled. A removed node keeps
/// its id while it sits in an undo stack, and gets it back on restore.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// The permanent root of every scene graph
    pub const ROOT: NodeId = NodeId(0);

    /// Create an id from its raw value
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Check whether this is the scene root
    #[inline]
    pub const fn is_root(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "NodeId(root)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread-safe node id allocator
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first id follows the root
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next unique id
    pub fn allocate(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Make sure future ids are strictly greater than `id`.
    ///
    /// Used after ids were read back from a saved document.
    pub fn reserve_past(&self, id: NodeId) {
        self.next.fetch_max(id.0 + 1, Ordering::Relaxed);
    }

    /// Peek at the id the next call to [`allocate`](Self::allocate) returns
    pub fn peek(&self) -> NodeId {
        NodeId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for IdAllocator {
    fn clone(&self) -> Self {
        Self {
            next: AtomicU64::new(self.next.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_skips_root() {
        let ids = IdAllocator::new();
        let first = ids.allocate();
        let second = ids.allocate();
        assert!(!first.is_root());
        assert_eq!(first.raw(), 1);
        assert_eq!(second.raw(), 2);
    }

    #[test]
    fn test_reserve_past() {
        let ids = IdAllocator::new();
        ids.reserve_past(NodeId::from_raw(41));
        assert_eq!(ids.allocate().raw(), 42);

        // Never moves backwards
        ids.reserve_past(NodeId::from_raw(3));
        assert_eq!(ids.allocate().raw(), 43);
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(NodeId::from_raw(7).to_string(), "#7");
        assert_eq!(format!("{:?}", NodeId::ROOT), "NodeId(root)");

        let json = serde_json::to_string(&NodeId::from_raw(12)).unwrap();
        assert_eq!(json, "12");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NodeId::from_raw(12));
    }
}

//! Dotted property paths
//!
//! A [`PropertyPath`] names one value reachable from a node, such as
//! `"name"`, `"position"` or `"position.x"`. Paths are compared segment-wise,
//! so `"position"` is an ancestor of `"position.x"` but not of `"positional"`.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A dotted path naming a property of a node
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyPath(String);

impl PropertyPath {
    /// Segment separator
    pub const SEPARATOR: char = '.';

    /// Create a path from a dotted string
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The full dotted string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(Self::SEPARATOR)
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.segments().count()
        }
    }

    /// First segment, if any
    pub fn head(&self) -> Option<&str> {
        self.segments().next().filter(|s| !s.is_empty())
    }

    /// The path with its last segment removed
    pub fn parent(&self) -> Option<PropertyPath> {
        self.0
            .rsplit_once(Self::SEPARATOR)
            .map(|(parent, _)| PropertyPath::new(parent))
    }

    /// Append a segment
    pub fn child(&self, segment: &str) -> PropertyPath {
        if self.0.is_empty() {
            PropertyPath::new(segment)
        } else {
            PropertyPath(format!("{}{}{}", self.0, Self::SEPARATOR, segment))
        }
    }

    /// Strict ancestor test: `"a"` is an ancestor of `"a.b"` but not of `"a"`.
    pub fn is_ancestor_of(&self, other: &PropertyPath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0[self.0.len()..].starts_with(Self::SEPARATOR)
    }

    /// True when one path equals, contains, or is contained by the other.
    ///
    /// A change at either path may change the value read at the other.
    pub fn overlaps(&self, other: &PropertyPath) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({:?})", self.0)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PropertyPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&PropertyPath> for PropertyPath {
    fn from(p: &PropertyPath) -> Self {
        p.clone()
    }
}

impl AsRef<str> for PropertyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_and_parent() {
        let path = PropertyPath::new("position.x");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["position", "x"]);
        assert_eq!(path.depth(), 2);
        assert_eq!(path.head(), Some("position"));
        assert_eq!(path.parent(), Some(PropertyPath::new("position")));
        assert_eq!(PropertyPath::new("name").parent(), None);
        assert_eq!(PropertyPath::new("").depth(), 0);
    }

    #[test]
    fn test_child() {
        let path = PropertyPath::new("properties").child("mass");
        assert_eq!(path.as_str(), "properties.mass");
        assert_eq!(PropertyPath::new("").child("name").as_str(), "name");
    }

    #[test]
    fn test_ancestry_is_segment_wise() {
        let position = PropertyPath::new("position");
        let x = PropertyPath::new("position.x");
        let positional = PropertyPath::new("positional");

        assert!(position.is_ancestor_of(&x));
        assert!(!x.is_ancestor_of(&position));
        assert!(!position.is_ancestor_of(&position));
        assert!(!position.is_ancestor_of(&positional));
    }

    #[test]
    fn test_overlaps() {
        let position = PropertyPath::new("position");
        let x = PropertyPath::new("position.x");
        let y = PropertyPath::new("position.y");

        assert!(position.overlaps(&x));
        assert!(x.overlaps(&position));
        assert!(x.overlaps(&x));
        assert!(!x.overlaps(&y));
        assert!(!PropertyPath::new("x").overlaps(&PropertyPath::new("y")));
    }
}

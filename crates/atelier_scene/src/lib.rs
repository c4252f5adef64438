//! # atelier_scene - Editable Scene Graph
//!
//! The object graph edited by the editor, and the per-frame systems that
//! run over it.
//!
//! - [`SceneGraph`]: arena of [`SceneNode`]s addressed by stable
//!   [`NodeId`](atelier_core::NodeId) handles, with a permanent root
//! - Property access by [`PropertyPath`](atelier_core::PropertyPath):
//!   `name`, `visible`, `position`, `rotation.y`, `properties.mass`, ...
//! - [`SceneDocument`]: JSON persistence through a
//!   [`FileSource`](atelier_asset::FileSource)
//! - [`lod`]: distance-based level of detail with hysteresis, backed by the
//!   streaming model cache

pub mod document;
pub mod graph;
pub mod lod;

pub use document::{DocumentError, NodeRecord, SceneDocument};
pub use graph::{
    DetachedSubtree, GraphError, GraphResult, NodeKind, PropertyValue, SceneGraph, SceneNode,
    Transform,
};
pub use lod::{LodController, LodError, LodLevel, LodSystem, LodUpdate, Viewer};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::document::SceneDocument;
    pub use crate::graph::{GraphError, NodeKind, PropertyValue, SceneGraph, SceneNode, Transform};
    pub use crate::lod::{LodController, LodSystem, LodUpdate, Viewer};
}

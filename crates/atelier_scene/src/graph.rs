//! Scene graph
//!
//! Nodes live in an arena keyed by [`NodeId`]. Structure (parent and
//! ordered children) is only changed through [`SceneGraph`] methods, which
//! keep both directions of every link consistent and reject cycles.
//!
//! Removing a node never destroys it outright: [`SceneGraph::take_subtree`]
//! hands back a [`DetachedSubtree`] that [`SceneGraph::restore_subtree`]
//! puts back with the same ids at the same child index.

use std::collections::{BTreeMap, HashMap};

use atelier_asset::Model;
use atelier_core::{IdAllocator, NodeId, PropertyPath};
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Scene graph errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("The scene root cannot be modified")]
    RootImmutable,

    #[error("Attaching {child} under {parent} would create a cycle")]
    CycleDetected { child: NodeId, parent: NodeId },

    #[error("Invalid property path: {0}")]
    InvalidPath(PropertyPath),

    #[error("Type mismatch at '{path}': expected {expected}, got {found}")]
    TypeMismatch {
        path: PropertyPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

// ============================================================================
// Values
// ============================================================================

/// Local transform. Rotation is XYZ Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Identity transform at `position`
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Local-to-parent matrix
    pub fn to_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Value read from or written to a property path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Vec3(Vec3),
}

impl PropertyValue {
    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Vec3(_) => "vec3",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value; integers widen to float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec3> for PropertyValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// What a node represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain grouping node
    Group,
    /// Placed model asset
    Model { asset: String },
    /// Visual materialised by a level-of-detail controller. Runtime only.
    LodVisual { level: usize },
}

impl NodeKind {
    pub fn is_lod_visual(&self) -> bool {
        matches!(self, Self::LodVisual { .. })
    }
}

/// A node in the scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub(crate) id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    /// Custom scalar properties
    pub properties: BTreeMap<String, PropertyValue>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Working copy of the model rendered for this node
    pub model: Option<Model>,
}

impl SceneNode {
    fn new(id: NodeId, name: String, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            kind,
            transform: Transform::IDENTITY,
            visible: true,
            properties: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            model: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A subtree removed from the graph, ready to be restored
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedSubtree {
    /// Root of the subtree
    pub root: NodeId,
    /// Parent to restore under
    pub parent: NodeId,
    /// Index among the parent's children
    pub index: usize,
    /// Every node of the subtree, root first
    pub nodes: Vec<SceneNode>,
}

// ============================================================================
// Scene Graph
// ============================================================================

/// Arena of scene nodes with a permanent root
#[derive(Debug)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, SceneNode>,
    ids: IdAllocator,
}

impl SceneGraph {
    /// Create a graph holding only the root
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeId::ROOT,
            SceneNode::new(NodeId::ROOT, "root".to_string(), NodeKind::Group),
        );
        Self {
            nodes,
            ids: IdAllocator::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of nodes, root excluded
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    /// Get a node or fail with [`GraphError::NodeNotFound`]
    pub fn node(&self, id: NodeId) -> GraphResult<&SceneNode> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut SceneNode> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Iterate over every node, root included, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    /// Create a node as the last child of `parent`
    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        parent: NodeId,
    ) -> GraphResult<NodeId> {
        if !self.contains(parent) {
            return Err(GraphError::NodeNotFound(parent));
        }
        let id = self.ids.allocate();
        self.nodes.insert(id, SceneNode::new(id, name.into(), kind));
        self.link(id, parent, None)?;
        Ok(id)
    }

    /// Insert a node with a known id, unlinked. Used when reading documents.
    pub(crate) fn insert_unlinked(&mut self, mut node: SceneNode) -> GraphResult<()> {
        if self.contains(node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        node.parent = None;
        node.children.clear();
        self.ids.reserve_past(node.id);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> GraphResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Parent and index among its children, or `None` for a detached node
    pub fn position_in_parent(&self, id: NodeId) -> GraphResult<Option<(NodeId, usize)>> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|c| *c == id)
            .unwrap_or(0);
        Ok(Some((parent, index)))
    }

    /// Strict ancestor test
    pub fn is_ancestor(&self, ancestor: NodeId, of: NodeId) -> bool {
        let mut current = self.get(of).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Move `child` under `parent` at `index` (end when `None`)
    pub fn attach(&mut self, child: NodeId, parent: NodeId, index: Option<usize>) -> GraphResult<()> {
        if child.is_root() {
            return Err(GraphError::RootImmutable);
        }
        self.node(child)?;
        self.node(parent)?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(GraphError::CycleDetected { child, parent });
        }
        self.unlink(child)?;
        self.link(child, parent, index)
    }

    /// Unlink `child` from its parent, keeping it in the arena.
    ///
    /// Returns where it was attached.
    pub fn detach(&mut self, child: NodeId) -> GraphResult<Option<(NodeId, usize)>> {
        if child.is_root() {
            return Err(GraphError::RootImmutable);
        }
        self.unlink(child)
    }

    fn link(&mut self, child: NodeId, parent: NodeId, index: Option<usize>) -> GraphResult<()> {
        let parent_node = self.node_mut(parent)?;
        let index = index
            .unwrap_or(parent_node.children.len())
            .min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn unlink(&mut self, child: NodeId) -> GraphResult<Option<(NodeId, usize)>> {
        let Some(parent) = self.node_mut(child)?.parent.take() else {
            return Ok(None);
        };
        let siblings = &mut self.node_mut(parent)?.children;
        let index = siblings.iter().position(|c| *c == child);
        if let Some(index) = index {
            siblings.remove(index);
        }
        Ok(Some((parent, index.unwrap_or(0))))
    }

    /// `id` and everything below it, depth first, parents before children
    pub fn subtree(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.node(id)?;
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            if let Some(node) = self.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(order)
    }

    /// Everything below `id`, depth first
    pub fn descendants(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        let mut all = self.subtree(id)?;
        all.remove(0);
        Ok(all)
    }

    /// Remove `id` and its descendants from the graph
    pub fn take_subtree(&mut self, id: NodeId) -> GraphResult<DetachedSubtree> {
        if id.is_root() {
            return Err(GraphError::RootImmutable);
        }
        let order = self.subtree(id)?;
        let (parent, index) = self.unlink(id)?.unwrap_or((NodeId::ROOT, usize::MAX));
        let nodes = order
            .iter()
            .filter_map(|n| self.nodes.remove(n))
            .collect();
        Ok(DetachedSubtree {
            root: id,
            parent,
            index,
            nodes,
        })
    }

    /// Check that [`restore_subtree`](Self::restore_subtree) would succeed
    pub fn check_restore(&self, subtree: &DetachedSubtree) -> GraphResult<()> {
        if !self.contains(subtree.parent) {
            return Err(GraphError::NodeNotFound(subtree.parent));
        }
        if let Some(taken) = subtree.nodes.iter().find(|n| self.contains(n.id)) {
            return Err(GraphError::DuplicateNode(taken.id));
        }
        Ok(())
    }

    /// Put a detached subtree back with its original ids and child order
    pub fn restore_subtree(&mut self, subtree: DetachedSubtree) -> GraphResult<NodeId> {
        self.check_restore(&subtree)?;
        let DetachedSubtree {
            root,
            parent,
            index,
            nodes,
        } = subtree;
        for mut node in nodes {
            self.ids.reserve_past(node.id);
            if node.id == root {
                node.parent = None;
            }
            self.nodes.insert(node.id, node);
        }
        self.link(root, parent, Some(index))?;
        Ok(root)
    }

    /// Deep copy of the subtree at `id` with fresh ids, detached.
    ///
    /// The copy is placed right after the source among its siblings when
    /// restored. Level-of-detail visuals are not copied.
    pub fn clone_subtree(&self, id: NodeId) -> GraphResult<DetachedSubtree> {
        if id.is_root() {
            return Err(GraphError::RootImmutable);
        }
        let (parent, index) = self
            .position_in_parent(id)?
            .map_or((NodeId::ROOT, usize::MAX), |(p, i)| (p, i + 1));

        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        let order: Vec<NodeId> = self
            .subtree(id)?
            .into_iter()
            .filter(|n| {
                *n == id || self.get(*n).map_or(false, |node| !node.kind.is_lod_visual())
            })
            .collect();
        for old in &order {
            remap.insert(*old, self.ids.allocate());
        }

        let mut nodes = Vec::with_capacity(order.len());
        for old in &order {
            let source = self.node(*old)?;
            let mut copy = source.clone();
            copy.id = remap[old];
            copy.parent = source.parent.and_then(|p| remap.get(&p).copied());
            copy.children = source
                .children
                .iter()
                .filter_map(|c| remap.get(c).copied())
                .collect();
            nodes.push(copy);
        }

        Ok(DetachedSubtree {
            root: remap[&id],
            parent,
            index,
            nodes,
        })
    }

    /// Local-to-world matrix
    pub fn world_matrix(&self, id: NodeId) -> GraphResult<Mat4> {
        let mut matrix = self.node(id)?.transform.to_matrix();
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            let node = self.node(parent)?;
            matrix = node.transform.to_matrix() * matrix;
            current = node.parent;
        }
        Ok(matrix)
    }

    /// World-space position of a node's origin
    pub fn world_position(&self, id: NodeId) -> GraphResult<Vec3> {
        Ok(self.world_matrix(id)?.transform_point3(Vec3::ZERO))
    }

    // ------------------------------------------------------------------------
    // Property access
    // ------------------------------------------------------------------------

    /// Read the value at `path`
    pub fn get_property(&self, id: NodeId, path: &PropertyPath) -> GraphResult<PropertyValue> {
        let node = self.node(id)?;
        let segments: Vec<&str> = path.segments().collect();
        let invalid = || GraphError::InvalidPath(path.clone());

        match segments.as_slice() {
            ["name"] => Ok(PropertyValue::Text(node.name.clone())),
            ["visible"] => Ok(PropertyValue::Bool(node.visible)),
            [field] => transform_field(&node.transform, field)
                .map(PropertyValue::Vec3)
                .ok_or_else(invalid),
            [field, axis] if *field != "properties" => {
                let v = transform_field(&node.transform, field).ok_or_else(invalid)?;
                component(v, axis)
                    .map(|c| PropertyValue::Float(c as f64))
                    .ok_or_else(invalid)
            }
            ["properties", key] => node.properties.get(*key).cloned().ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }

    /// Check whether a custom property exists
    pub fn has_property(&self, id: NodeId, key: &str) -> bool {
        self.get(id).map_or(false, |n| n.properties.contains_key(key))
    }

    /// Write `value` at `path`, returning the previous value.
    ///
    /// The previous value is `None` only for a custom property that did not
    /// exist yet.
    pub fn set_property(
        &mut self,
        id: NodeId,
        path: &PropertyPath,
        value: PropertyValue,
    ) -> GraphResult<Option<PropertyValue>> {
        if id.is_root() {
            return Err(GraphError::RootImmutable);
        }
        let node = self.node_mut(id)?;
        let segments: Vec<&str> = path.segments().collect();
        let invalid = || GraphError::InvalidPath(path.clone());
        let mismatch = |expected: &'static str, value: &PropertyValue| GraphError::TypeMismatch {
            path: path.clone(),
            expected,
            found: value.type_name(),
        };

        match segments.as_slice() {
            ["name"] => match value {
                PropertyValue::Text(name) => Ok(Some(PropertyValue::Text(std::mem::replace(
                    &mut node.name,
                    name,
                )))),
                other => Err(mismatch("text", &other)),
            },
            ["visible"] => match value {
                PropertyValue::Bool(visible) => Ok(Some(PropertyValue::Bool(std::mem::replace(
                    &mut node.visible,
                    visible,
                )))),
                other => Err(mismatch("bool", &other)),
            },
            [field] => {
                let slot = transform_field_mut(&mut node.transform, field).ok_or_else(invalid)?;
                let v = value.as_vec3().ok_or_else(|| mismatch("vec3", &value))?;
                Ok(Some(PropertyValue::Vec3(std::mem::replace(slot, v))))
            }
            [field, axis] if *field != "properties" => {
                let slot = transform_field_mut(&mut node.transform, field).ok_or_else(invalid)?;
                let c = component_mut(slot, axis).ok_or_else(invalid)?;
                let v = value.as_float().ok_or_else(|| mismatch("float", &value))?;
                let old = std::mem::replace(c, v as f32);
                Ok(Some(PropertyValue::Float(old as f64)))
            }
            ["properties", key] => Ok(node.properties.insert(key.to_string(), value)),
            _ => Err(invalid()),
        }
    }

    /// Delete a custom property, returning its value
    pub fn remove_property(&mut self, id: NodeId, key: &str) -> GraphResult<Option<PropertyValue>> {
        if id.is_root() {
            return Err(GraphError::RootImmutable);
        }
        Ok(self.node_mut(id)?.properties.remove(key))
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            ids: self.ids.clone(),
        }
    }
}

impl PartialEq for SceneGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

fn transform_field(transform: &Transform, field: &str) -> Option<Vec3> {
    match field {
        "position" => Some(transform.position),
        "rotation" => Some(transform.rotation),
        "scale" => Some(transform.scale),
        _ => None,
    }
}

fn transform_field_mut<'a>(transform: &'a mut Transform, field: &str) -> Option<&'a mut Vec3> {
    match field {
        "position" => Some(&mut transform.position),
        "rotation" => Some(&mut transform.rotation),
        "scale" => Some(&mut transform.scale),
        _ => None,
    }
}

fn component(v: Vec3, axis: &str) -> Option<f32> {
    match axis {
        "x" => Some(v.x),
        "y" => Some(v.y),
        "z" => Some(v.z),
        _ => None,
    }
}

fn component_mut<'a>(v: &'a mut Vec3, axis: &str) -> Option<&'a mut f32> {
    match axis {
        "x" => Some(&mut v.x),
        "y" => Some(&mut v.y),
        "z" => Some(&mut v.z),
        _ => None,
    }
}

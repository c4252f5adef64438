//! Structural commands: add, remove, duplicate and reparent nodes.
//!
//! Structural edits are announced as a change of the parent's `children`.

use atelier_asset::Model;
use atelier_core::NodeId;
use atelier_scene::{DetachedSubtree, NodeKind, Transform};

use super::command::{not_executed, Command, CommandError, CommandResult};
use crate::core::EditorState;

const CHILDREN: &str = "children";

fn require(state: &EditorState, id: NodeId) -> CommandResult {
    if state.graph.contains(id) {
        Ok(())
    } else {
        Err(CommandError::NodeNotFound(id))
    }
}

/// Put a subtree back, keeping it in `slot` if that fails
fn restore(state: &mut EditorState, slot: &mut Option<DetachedSubtree>, description: &str) -> CommandResult {
    let subtree = slot.as_ref().ok_or_else(|| not_executed(description))?;
    state.graph.check_restore(subtree)?;
    let parent = subtree.parent;
    if let Some(subtree) = slot.take() {
        state.graph.restore_subtree(subtree)?;
    }
    state.notify(parent, CHILDREN);
    Ok(())
}

/// Take a subtree out of the graph into `slot`
fn take(state: &mut EditorState, root: NodeId, slot: &mut Option<DetachedSubtree>) -> CommandResult {
    require(state, root)?;
    let subtree = state.graph.take_subtree(root)?;
    let parent = subtree.parent;
    *slot = Some(subtree);
    state.notify(parent, CHILDREN);
    Ok(())
}

fn release_detached(slot: &mut Option<DetachedSubtree>, description: &str) {
    if let Some(subtree) = slot.take() {
        log::debug!(
            "'{}' released {} detached node(s) under {}",
            description,
            subtree.nodes.len(),
            subtree.root
        );
    }
}

// ============================================================================
// Add
// ============================================================================

/// Create a node under a parent
pub struct AddNodeCommand {
    name: String,
    kind: NodeKind,
    parent: NodeId,
    transform: Transform,
    model: Option<Model>,
    created: Option<NodeId>,
    /// Holds the node while the command is undone
    detached: Option<DetachedSubtree>,
}

impl AddNodeCommand {
    pub fn new(name: impl Into<String>, kind: NodeKind, parent: NodeId) -> Self {
        Self {
            name: name.into(),
            kind,
            parent,
            transform: Transform::IDENTITY,
            model: None,
            created: None,
            detached: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Attach a working copy of a model to the new node
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    /// Id of the created node, once executed
    pub fn created(&self) -> Option<NodeId> {
        self.created
    }
}

impl Command for AddNodeCommand {
    fn description(&self) -> &str {
        "Add Node"
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        if self.created.is_some() {
            return restore(state, &mut self.detached, "Add Node");
        }
        let id = state
            .graph
            .create_node(self.name.clone(), self.kind.clone(), self.parent)?;
        let node = state.graph.node_mut(id)?;
        node.transform = self.transform;
        node.model = self.model.take();
        self.created = Some(id);
        state.notify(self.parent, CHILDREN);
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let id = self.created.ok_or_else(|| not_executed("Add Node"))?;
        take(state, id, &mut self.detached)
    }

    fn release(&mut self) {
        release_detached(&mut self.detached, "Add Node");
    }
}

// ============================================================================
// Remove
// ============================================================================

/// Remove a node and its descendants
pub struct RemoveNodeCommand {
    node: NodeId,
    detached: Option<DetachedSubtree>,
}

impl RemoveNodeCommand {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            detached: None,
        }
    }
}

impl Command for RemoveNodeCommand {
    fn description(&self) -> &str {
        "Remove Node"
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        take(state, self.node, &mut self.detached)
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        restore(state, &mut self.detached, "Remove Node")
    }

    fn release(&mut self) {
        release_detached(&mut self.detached, "Remove Node");
    }
}

// ============================================================================
// Duplicate
// ============================================================================

/// Deep-copy a node right after itself
pub struct DuplicateNodeCommand {
    source: NodeId,
    copy: Option<NodeId>,
    detached: Option<DetachedSubtree>,
}

impl DuplicateNodeCommand {
    pub fn new(source: NodeId) -> Self {
        Self {
            source,
            copy: None,
            detached: None,
        }
    }

    /// Id of the copy, once executed
    pub fn copy(&self) -> Option<NodeId> {
        self.copy
    }
}

impl Command for DuplicateNodeCommand {
    fn description(&self) -> &str {
        "Duplicate Node"
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        if self.copy.is_some() {
            return restore(state, &mut self.detached, "Duplicate Node");
        }
        require(state, self.source)?;
        let subtree = state.graph.clone_subtree(self.source)?;
        let parent = subtree.parent;
        self.copy = Some(state.graph.restore_subtree(subtree)?);
        state.notify(parent, CHILDREN);
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let copy = self.copy.ok_or_else(|| not_executed("Duplicate Node"))?;
        take(state, copy, &mut self.detached)
    }

    fn release(&mut self) {
        release_detached(&mut self.detached, "Duplicate Node");
    }
}

// ============================================================================
// Reparent
// ============================================================================

/// Move a node under a new parent
pub struct ReparentCommand {
    node: NodeId,
    new_parent: NodeId,
    index: Option<usize>,
    previous: Option<(NodeId, usize)>,
}

impl ReparentCommand {
    /// Move `node` to the end of `new_parent`'s children
    pub fn new(node: NodeId, new_parent: NodeId) -> Self {
        Self {
            node,
            new_parent,
            index: None,
            previous: None,
        }
    }

    /// Move `node` to `index` among `new_parent`'s children
    pub fn at_index(node: NodeId, new_parent: NodeId, index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::new(node, new_parent)
        }
    }
}

impl Command for ReparentCommand {
    fn description(&self) -> &str {
        "Reparent Node"
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        require(state, self.node)?;
        require(state, self.new_parent)?;
        let previous = state
            .graph
            .position_in_parent(self.node)?
            .ok_or_else(|| CommandError::InvalidOperation(format!("{} is detached", self.node)))?;

        state.graph.attach(self.node, self.new_parent, self.index)?;
        self.previous = Some(previous);

        state.notify(previous.0, CHILDREN);
        if previous.0 != self.new_parent {
            state.notify(self.new_parent, CHILDREN);
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let (parent, index) = self.previous.ok_or_else(|| not_executed("Reparent Node"))?;
        state.graph.attach(self.node, parent, Some(index))?;
        self.previous = None;

        state.notify(parent, CHILDREN);
        if parent != self.new_parent {
            state.notify(self.new_parent, CHILDREN);
        }
        Ok(())
    }
}

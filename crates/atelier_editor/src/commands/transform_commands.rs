//! Transform commands.
//!
//! Undo restores the captured values rather than applying the inverse
//! delta, so a translate/undo pair leaves positions bit-for-bit unchanged.

use atelier_core::NodeId;
use atelier_scene::Transform;
use glam::Vec3;

use super::command::{not_executed, Command, CommandError, CommandResult};
use crate::core::EditorState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Position,
    Rotation,
    Scale,
}

impl Channel {
    const ALL: [Channel; 3] = [Channel::Position, Channel::Rotation, Channel::Scale];

    fn path(self) -> &'static str {
        match self {
            Channel::Position => "position",
            Channel::Rotation => "rotation",
            Channel::Scale => "scale",
        }
    }

    fn get(self, transform: &Transform) -> Vec3 {
        match self {
            Channel::Position => transform.position,
            Channel::Rotation => transform.rotation,
            Channel::Scale => transform.scale,
        }
    }

    fn slot(self, transform: &mut Transform) -> &mut Vec3 {
        match self {
            Channel::Position => &mut transform.position,
            Channel::Rotation => &mut transform.rotation,
            Channel::Scale => &mut transform.scale,
        }
    }
}

/// Relative edit of one transform channel on several nodes
struct ChannelEdit {
    channel: Channel,
    targets: Vec<NodeId>,
    amount: Vec3,
    combine: fn(Vec3, Vec3) -> Vec3,
    previous: Vec<Vec3>,
    description: &'static str,
}

impl ChannelEdit {
    fn new(
        channel: Channel,
        mut targets: Vec<NodeId>,
        amount: Vec3,
        combine: fn(Vec3, Vec3) -> Vec3,
        description: &'static str,
    ) -> Self {
        let mut seen = std::collections::HashSet::new();
        targets.retain(|t| seen.insert(*t));
        Self {
            channel,
            targets,
            amount,
            combine,
            previous: Vec::new(),
            description,
        }
    }

    fn capture(&self, state: &EditorState) -> Result<Vec<Vec3>, CommandError> {
        self.targets
            .iter()
            .map(|id| {
                state
                    .graph
                    .get(*id)
                    .map(|node| self.channel.get(&node.transform))
                    .ok_or(CommandError::NodeNotFound(*id))
            })
            .collect()
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        if self.targets.is_empty() {
            return Err(CommandError::InvalidOperation(format!(
                "'{}' has no target nodes",
                self.description
            )));
        }
        let previous = self.capture(state)?;
        for (id, old) in self.targets.iter().zip(&previous) {
            let node = state.graph.node_mut(*id)?;
            *self.channel.slot(&mut node.transform) = (self.combine)(*old, self.amount);
            state.notify(*id, self.channel.path());
        }
        self.previous = previous;
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        if self.previous.len() != self.targets.len() {
            return Err(not_executed(self.description));
        }
        self.capture(state)?;
        for (id, old) in self.targets.iter().zip(&self.previous) {
            let node = state.graph.node_mut(*id)?;
            *self.channel.slot(&mut node.transform) = *old;
            state.notify(*id, self.channel.path());
        }
        self.previous.clear();
        Ok(())
    }
}

// ============================================================================
// Translate / Rotate / Scale
// ============================================================================

/// Move nodes by a delta
pub struct TranslateCommand(ChannelEdit);

impl TranslateCommand {
    pub fn new(node: NodeId, delta: Vec3) -> Self {
        Self::many(vec![node], delta)
    }

    pub fn many(nodes: Vec<NodeId>, delta: Vec3) -> Self {
        Self(ChannelEdit::new(Channel::Position, nodes, delta, |v, d| v + d, "Translate"))
    }
}

impl Command for TranslateCommand {
    fn description(&self) -> &str {
        self.0.description
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        self.0.execute(state)
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        self.0.undo(state)
    }
}

/// Rotate nodes by Euler angle deltas (radians)
pub struct RotateCommand(ChannelEdit);

impl RotateCommand {
    pub fn new(node: NodeId, delta: Vec3) -> Self {
        Self::many(vec![node], delta)
    }

    pub fn many(nodes: Vec<NodeId>, delta: Vec3) -> Self {
        Self(ChannelEdit::new(Channel::Rotation, nodes, delta, |v, d| v + d, "Rotate"))
    }
}

impl Command for RotateCommand {
    fn description(&self) -> &str {
        self.0.description
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        self.0.execute(state)
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        self.0.undo(state)
    }
}

/// Scale nodes by per-axis factors
pub struct ScaleCommand(ChannelEdit);

impl ScaleCommand {
    pub fn new(node: NodeId, factor: Vec3) -> Self {
        Self::many(vec![node], factor)
    }

    /// Scale uniformly on every axis
    pub fn uniform(node: NodeId, factor: f32) -> Self {
        Self::new(node, Vec3::splat(factor))
    }

    pub fn many(nodes: Vec<NodeId>, factor: Vec3) -> Self {
        Self(ChannelEdit::new(Channel::Scale, nodes, factor, |v, f| v * f, "Scale"))
    }
}

impl Command for ScaleCommand {
    fn description(&self) -> &str {
        self.0.description
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        self.0.execute(state)
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        self.0.undo(state)
    }
}

// ============================================================================
// Set Transform
// ============================================================================

/// Replace a node's whole transform
pub struct SetTransformCommand {
    node: NodeId,
    transform: Transform,
    previous: Option<Transform>,
}

impl SetTransformCommand {
    pub fn new(node: NodeId, transform: Transform) -> Self {
        Self {
            node,
            transform,
            previous: None,
        }
    }

    fn apply(&self, state: &mut EditorState, from: Transform, to: Transform) -> CommandResult {
        state.graph.node_mut(self.node)?.transform = to;
        for channel in Channel::ALL {
            if channel.get(&from) != channel.get(&to) {
                state.notify(self.node, channel.path());
            }
        }
        Ok(())
    }
}

impl Command for SetTransformCommand {
    fn description(&self) -> &str {
        "Set Transform"
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        let current = state
            .graph
            .get(self.node)
            .map(|n| n.transform)
            .ok_or(CommandError::NodeNotFound(self.node))?;
        self.apply(state, current, self.transform)?;
        self.previous = Some(current);
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let previous = self.previous.ok_or_else(|| not_executed("Set Transform"))?;
        self.apply(state, self.transform, previous)?;
        self.previous = None;
        Ok(())
    }
}

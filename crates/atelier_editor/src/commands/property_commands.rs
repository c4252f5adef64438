//! Property commands.

use atelier_core::{NodeId, PropertyPath};
use atelier_scene::{GraphError, PropertyValue};

use super::command::{not_executed, Command, CommandError, CommandResult};
use crate::core::EditorState;

/// Write one value at a property path
pub struct SetPropertyCommand {
    node: NodeId,
    path: PropertyPath,
    value: PropertyValue,
    description: String,
    /// Outer `None`: not executed. Inner `None`: the property did not exist.
    previous: Option<Option<PropertyValue>>,
}

impl SetPropertyCommand {
    pub fn new(node: NodeId, path: impl Into<PropertyPath>, value: impl Into<PropertyValue>) -> Self {
        let path = path.into();
        Self {
            node,
            description: format!("Set {}", path),
            path,
            value: value.into(),
            previous: None,
        }
    }

    pub fn path(&self) -> &PropertyPath {
        &self.path
    }
}

impl Command for SetPropertyCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        if !state.graph.contains(self.node) {
            return Err(CommandError::NodeNotFound(self.node));
        }
        let previous = state
            .graph
            .set_property(self.node, &self.path, self.value.clone())?;
        self.previous = Some(previous);
        state.notify(self.node, &self.path);
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        match self.previous.as_ref() {
            None => return Err(not_executed(&self.description)),
            Some(Some(old)) => {
                state.graph.set_property(self.node, &self.path, old.clone())?;
            }
            Some(None) => {
                let key = match self.path.segments().collect::<Vec<_>>().as_slice() {
                    ["properties", key] => key.to_string(),
                    _ => return Err(GraphError::InvalidPath(self.path.clone()).into()),
                };
                state.graph.remove_property(self.node, &key)?;
            }
        }
        self.previous = None;
        state.notify(self.node, &self.path);
        Ok(())
    }
}

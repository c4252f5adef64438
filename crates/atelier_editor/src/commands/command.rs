//! Command trait and result types.

use atelier_core::NodeId;
use atelier_scene::GraphError;
use thiserror::Error;

use crate::core::EditorState;

/// Result type for command execution.
pub type CommandResult = Result<(), CommandError>;

/// Errors that can occur during command execution.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// A reversible edit of the scene.
///
/// `execute` and `undo` alternate, starting with `execute`. After `undo`
/// every node the command touched must compare equal to its state before
/// the matching `execute`.
///
/// # Example
///
/// ```ignore
/// struct RenameCommand {
///     node: NodeId,
///     name: String,
///     previous: Option<String>,
/// }
///
/// impl Command for RenameCommand {
///     fn description(&self) -> &str { "Rename" }
///
///     fn execute(&mut self, state: &mut EditorState) -> CommandResult {
///         let node = state.graph.node_mut(self.node)?;
///         self.previous = Some(std::mem::replace(&mut node.name, self.name.clone()));
///         state.notify(self.node, "name");
///         Ok(())
///     }
///
///     fn undo(&mut self, state: &mut EditorState) -> CommandResult {
///         if let Some(previous) = self.previous.take() {
///             state.graph.node_mut(self.node)?.name = previous;
///             state.notify(self.node, "name");
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Command: Send {
    /// Human-readable description for the undo/redo menu.
    fn description(&self) -> &str;

    /// Apply the edit.
    fn execute(&mut self, state: &mut EditorState) -> CommandResult;

    /// Reverse the last `execute`.
    fn undo(&mut self, state: &mut EditorState) -> CommandResult;

    /// Called once when the command leaves history for good. Frees anything
    /// only this command still owns, such as removed nodes.
    fn release(&mut self) {}
}

/// Command that was asked to undo before it ran
pub(crate) fn not_executed(description: &str) -> CommandError {
    CommandError::InvalidOperation(format!("'{}' has not been executed", description))
}

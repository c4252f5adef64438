//! Command pattern implementation for undo/redo.

mod command;
mod group;
mod node_commands;
mod property_commands;
mod transform_commands;

pub use command::{Command, CommandError, CommandResult};
pub use group::CommandGroup;
pub use node_commands::{AddNodeCommand, DuplicateNodeCommand, RemoveNodeCommand, ReparentCommand};
pub use property_commands::SetPropertyCommand;
pub use transform_commands::{RotateCommand, ScaleCommand, SetTransformCommand, TranslateCommand};

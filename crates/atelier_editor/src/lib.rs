//! # atelier_editor - Scene Editing Engine
//!
//! Every change to the scene goes through a [`Command`]: an object that can
//! apply its edit, reverse it exactly, and release what it owns once it
//! leaves history for good. The [`Commander`] sequences commands through a
//! bounded undo stack and a redo stack.
//!
//! Commands emit a [`MutationEvent`](atelier_event::MutationEvent) for the
//! most specific property path they change, so UI fragments observing a
//! `(node, path)` pair re-render exactly when needed.
//!
//! [`EditorSession`] ties one editing session together: scene state,
//! history, the streaming model cache and the level-of-detail system.
//!
//! ## Example
//!
//! ```ignore
//! use atelier_editor::prelude::*;
//!
//! let mut session = EditorSession::new(EditorConfig::default(), source);
//! let tree = session.add_node("tree", NodeKind::Group, NodeId::ROOT)?;
//! session.execute(TranslateCommand::new(tree, Vec3::X))?;
//! session.undo()?;
//! ```

pub mod commands;
pub mod core;
pub mod session;

pub use commands::{
    AddNodeCommand, Command, CommandError, CommandGroup, CommandResult, DuplicateNodeCommand,
    RemoveNodeCommand, ReparentCommand, RotateCommand, ScaleCommand, SetPropertyCommand,
    SetTransformCommand, TranslateCommand,
};
pub use crate::core::{Commander, ConfigError, EditorConfig, EditorState};
pub use session::{EditorSession, SessionError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::*;
    pub use crate::core::{Commander, EditorConfig, EditorState};
    pub use crate::session::EditorSession;
    pub use atelier_core::{NodeId, PropertyPath};
    pub use atelier_scene::{NodeKind, PropertyValue, Transform, Viewer};
    pub use glam::Vec3;
}

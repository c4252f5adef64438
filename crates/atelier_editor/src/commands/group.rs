//! Several commands executed as a single undoable unit.

use super::command::{Command, CommandResult};
use crate::core::EditorState;

/// A group of commands that succeeds or fails as a whole.
///
/// If a member fails, the members already applied are undone in reverse
/// order before the error is returned, so the scene is left as it was.
pub struct CommandGroup {
    description: String,
    commands: Vec<Box<dyn Command>>,
    /// Members currently applied, counted from the front
    applied: usize,
}

impl CommandGroup {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
            applied: 0,
        }
    }

    pub fn push(&mut self, command: impl Command + 'static) {
        self.commands.push(Box::new(command));
    }

    pub fn with(mut self, command: impl Command + 'static) -> Self {
        self.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn roll_back(&mut self, state: &mut EditorState) {
        while self.applied > 0 {
            self.applied -= 1;
            if let Err(e) = self.commands[self.applied].undo(state) {
                log::error!(
                    "Rollback of '{}' in '{}' failed: {}",
                    self.commands[self.applied].description(),
                    self.description,
                    e
                );
            }
        }
    }

    fn roll_forward(&mut self, state: &mut EditorState, until: usize) {
        while self.applied < until {
            if let Err(e) = self.commands[self.applied].execute(state) {
                log::error!(
                    "Re-applying '{}' in '{}' failed: {}",
                    self.commands[self.applied].description(),
                    self.description,
                    e
                );
            }
            self.applied += 1;
        }
    }
}

impl Command for CommandGroup {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, state: &mut EditorState) -> CommandResult {
        while self.applied < self.commands.len() {
            if let Err(e) = self.commands[self.applied].execute(state) {
                self.roll_back(state);
                return Err(e);
            }
            self.applied += 1;
        }
        Ok(())
    }

    fn undo(&mut self, state: &mut EditorState) -> CommandResult {
        let until = self.applied;
        while self.applied > 0 {
            if let Err(e) = self.commands[self.applied - 1].undo(state) {
                self.roll_forward(state, until);
                return Err(e);
            }
            self.applied -= 1;
        }
        Ok(())
    }

    fn release(&mut self) {
        for command in &mut self.commands {
            command.release();
        }
    }
}

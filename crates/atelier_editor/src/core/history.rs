//! Undo/redo history.
//!
//! All scene modifications go through the [`Commander`] so they can be
//! undone. The undo stack is bounded; commands that fall off it, or that are
//! discarded from the redo stack, are released exactly once.

use std::collections::VecDeque;

use crate::commands::{Command, CommandError, CommandResult};
use crate::core::EditorState;

/// Executes commands and keeps their undo/redo history.
pub struct Commander {
    /// Oldest first; the back is the next command to undo
    undo_stack: VecDeque<Box<dyn Command>>,
    /// The last element is the next command to redo
    redo_stack: Vec<Box<dyn Command>>,
    max_size: usize,
    /// Whether history has moved since the last save
    dirty: bool,
}

impl Default for Commander {
    fn default() -> Self {
        Self::new()
    }
}

impl Commander {
    /// Default maximum number of undoable commands.
    pub const DEFAULT_MAX_SIZE: usize = 20;

    pub fn new() -> Self {
        Self::with_max_size(Self::DEFAULT_MAX_SIZE)
    }

    /// A limit of zero is raised to one.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
            dirty: false,
        }
    }

    /// Execute `command` and record it.
    ///
    /// On failure nothing is recorded and both stacks are unchanged. On
    /// success the redo stack is discarded.
    pub fn execute(&mut self, mut command: Box<dyn Command>, state: &mut EditorState) -> CommandResult {
        if let Err(e) = command.execute(state) {
            log::warn!("Command '{}' failed: {}", command.description(), e);
            return Err(e);
        }
        self.record(command);
        Ok(())
    }

    /// Like [`execute`](Self::execute), but reads something back from the
    /// command before it is recorded, such as the id of a created node.
    pub fn execute_and<C, R>(
        &mut self,
        mut command: C,
        state: &mut EditorState,
        inspect: impl FnOnce(&C) -> R,
    ) -> Result<R, CommandError>
    where
        C: Command + 'static,
    {
        if let Err(e) = command.execute(state) {
            log::warn!("Command '{}' failed: {}", command.description(), e);
            return Err(e);
        }
        let output = inspect(&command);
        self.record(Box::new(command));
        Ok(output)
    }

    fn record(&mut self, command: Box<dyn Command>) {
        log::debug!("Executed '{}'", command.description());
        for mut discarded in self.redo_stack.drain(..) {
            discarded.release();
        }
        self.undo_stack.push_back(command);
        self.dirty = true;
        self.trim();
    }

    /// Undo the most recent command. Returns `Ok(false)` if there was
    /// nothing to undo.
    ///
    /// A command whose undo fails stays on the undo stack.
    pub fn undo(&mut self, state: &mut EditorState) -> Result<bool, CommandError> {
        let Some(mut command) = self.undo_stack.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = command.undo(state) {
            log::warn!("Undo of '{}' failed: {}", command.description(), e);
            self.undo_stack.push_back(command);
            return Err(e);
        }
        log::debug!("Undid '{}'", command.description());
        self.redo_stack.push(command);
        self.dirty = true;
        Ok(true)
    }

    /// Redo the most recently undone command. Returns `Ok(false)` if there
    /// was nothing to redo.
    pub fn redo(&mut self, state: &mut EditorState) -> Result<bool, CommandError> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.execute(state) {
            log::warn!("Redo of '{}' failed: {}", command.description(), e);
            self.redo_stack.push(command);
            return Err(e);
        }
        log::debug!("Redid '{}'", command.description());
        self.undo_stack.push_back(command);
        self.dirty = true;
        Ok(true)
    }

    /// Release and forget all history.
    pub fn clear(&mut self) {
        for mut command in self.undo_stack.drain(..) {
            command.release();
        }
        for mut command in self.redo_stack.drain(..) {
            command.release();
        }
        self.dirty = false;
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_size {
            if let Some(mut oldest) = self.undo_stack.pop_front() {
                log::debug!("History limit reached, releasing '{}'", oldest.description());
                oldest.release();
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the next command to undo.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Description of the next command to redo.
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Undo menu entries, most recent first.
    pub fn undo_descriptions(&self) -> Vec<&str> {
        self.undo_stack.iter().rev().map(|c| c.description()).collect()
    }

    /// Redo menu entries, next first.
    pub fn redo_descriptions(&self) -> Vec<&str> {
        self.redo_stack.iter().rev().map(|c| c.description()).collect()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the limit, releasing the oldest commands if over it.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        self.trim();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the current history position as saved.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }
}

impl Drop for Commander {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for Commander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commander")
            .field("undo", &self.undo_descriptions())
            .field("redo", &self.redo_descriptions())
            .field("max_size", &self.max_size)
            .field("dirty", &self.dirty)
            .finish()
    }
}

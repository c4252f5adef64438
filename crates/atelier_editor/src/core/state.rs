//! State that commands operate on

use atelier_core::{NodeId, PropertyPath};
use atelier_event::MutationNotifier;
use atelier_scene::SceneGraph;

/// The live scene plus the channel edits are announced on
#[derive(Debug, Default)]
pub struct EditorState {
    pub graph: SceneGraph,
    pub notifier: MutationNotifier,
}

impl EditorState {
    /// Create an empty scene announcing edits on `notifier`
    pub fn new(notifier: MutationNotifier) -> Self {
        Self {
            graph: SceneGraph::new(),
            notifier,
        }
    }

    /// Replace the scene. Observers of the old scene are not notified.
    pub fn with_graph(mut self, graph: SceneGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Announce that `path` on `target` changed
    pub fn notify(&self, target: NodeId, path: impl Into<PropertyPath>) {
        self.notifier.notify(target, path);
    }
}

//! One editing session.
//!
//! [`EditorSession`] is the context object handed to whatever drives the
//! editor: it owns the scene, its history, the model cache and the
//! level-of-detail system. Nothing here is global; two sessions never share
//! state.

use std::sync::Arc;

use atelier_asset::{CacheError, FileSource, JsonLoader, Model, SourceError, StreamingCache};
use atelier_core::{NodeId, PropertyPath};
use atelier_event::{MutationEvent, MutationNotifier, Subscription, Watch};
use atelier_scene::{
    DocumentError, LodController, LodError, LodSystem, LodUpdate, NodeKind, SceneDocument,
    SceneGraph, Viewer,
};
use thiserror::Error;

use crate::commands::{AddNodeCommand, Command, CommandError};
use crate::core::{Commander, EditorConfig, EditorState};

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Lod(#[from] LodError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Scene state, history, model cache and LOD for one editor
pub struct EditorSession {
    state: EditorState,
    commander: Commander,
    cache: StreamingCache<Model>,
    lod: LodSystem,
    source: Arc<dyn FileSource>,
    config: EditorConfig,
}

impl EditorSession {
    /// Create a session with an empty scene reading from `source`
    pub fn new(config: EditorConfig, source: Arc<dyn FileSource>) -> Self {
        let loader = Arc::new(JsonLoader::new(Arc::clone(&source)));
        let cache = StreamingCache::new(loader, config.cache.clone());
        log::info!(
            "Editor session: history limit {}, cache capacity {}",
            config.history_limit,
            cache.capacity()
        );
        Self {
            state: EditorState::new(MutationNotifier::new()),
            commander: Commander::with_max_size(config.history_limit),
            cache,
            lod: LodSystem::new(),
            source,
            config,
        }
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    pub fn execute<C: Command + 'static>(&mut self, command: C) -> Result<(), CommandError> {
        self.commander.execute(Box::new(command), &mut self.state)
    }

    pub fn execute_boxed(&mut self, command: Box<dyn Command>) -> Result<(), CommandError> {
        self.commander.execute(command, &mut self.state)
    }

    pub fn undo(&mut self) -> Result<bool, CommandError> {
        self.commander.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> Result<bool, CommandError> {
        self.commander.redo(&mut self.state)
    }

    pub fn clear_history(&mut self) {
        self.commander.clear();
    }

    pub fn can_undo(&self) -> bool {
        self.commander.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commander.can_redo()
    }

    /// Add an empty node through history, returning its id
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        parent: NodeId,
    ) -> Result<NodeId, CommandError> {
        let command = AddNodeCommand::new(name, kind, parent);
        self.add(command)
    }

    fn add(&mut self, command: AddNodeCommand) -> Result<NodeId, CommandError> {
        self.commander
            .execute_and(command, &mut self.state, |c| c.created())?
            .ok_or_else(|| CommandError::InvalidOperation("node was not created".into()))
    }

    // ------------------------------------------------------------------------
    // Access and observation
    // ------------------------------------------------------------------------

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.state.graph
    }

    pub fn notifier(&self) -> &MutationNotifier {
        &self.state.notifier
    }

    pub fn commander(&self) -> &Commander {
        &self.commander
    }

    pub fn cache(&self) -> &StreamingCache<Model> {
        &self.cache
    }

    pub fn lod(&self) -> &LodSystem {
        &self.lod
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Call `handler` whenever `path` on `target` or anything overlapping it
    /// changes
    pub fn observe<F>(&self, target: NodeId, path: impl Into<PropertyPath>, handler: F) -> Subscription
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        self.state.notifier.observe(target, path, handler)
    }

    pub fn watch(&self, target: NodeId, path: impl Into<PropertyPath>) -> Watch {
        self.state.notifier.watch(target, path)
    }

    // ------------------------------------------------------------------------
    // Level of detail
    // ------------------------------------------------------------------------

    /// Attach `controller` to `node`, replacing and resetting any previous one
    pub fn enable_lod(&mut self, node: NodeId, controller: LodController) -> Result<(), SessionError> {
        if !self.state.graph.contains(node) {
            return Err(LodError::NodeNotFound(node).into());
        }
        if let Some(mut previous) = self.lod.insert(node, controller) {
            previous.reset(&mut self.state.graph);
        }
        Ok(())
    }

    /// Detach the controller of `node` and remove its visual
    pub fn disable_lod(&mut self, node: NodeId) -> Option<LodController> {
        let mut controller = self.lod.remove(node)?;
        controller.reset(&mut self.state.graph);
        self.state.notify(node, "children");
        Some(controller)
    }

    /// Run one frame of level-of-detail selection
    pub fn tick(&mut self, viewer: &Viewer) -> Vec<(NodeId, Result<LodUpdate, LodError>)> {
        let results = self.lod.update_all(viewer, &mut self.state.graph, &self.cache);
        for (node, result) in &results {
            if let Ok(LodUpdate::Switched { .. }) = result {
                self.state.notify(*node, "children");
            }
        }
        results
    }

    // ------------------------------------------------------------------------
    // Assets and scenes
    // ------------------------------------------------------------------------

    /// Load a model through the cache and place a copy under `parent`
    pub async fn load_model(&mut self, asset: &str, parent: NodeId) -> Result<NodeId, SessionError> {
        let model = self.cache.load(asset).await?;
        let command = AddNodeCommand::new(
            model.name.clone(),
            NodeKind::Model {
                asset: asset.to_string(),
            },
            parent,
        )
        .with_model(model);
        Ok(self.add(command)?)
    }

    /// Write the scene to `path` and mark history as saved
    pub async fn save_scene(&mut self, path: &str) -> Result<(), SessionError> {
        let document = SceneDocument::from_graph(&self.state.graph);
        document.save(self.source.as_ref(), path).await?;
        self.commander.mark_saved();
        Ok(())
    }

    /// Replace the scene with the one at `path`.
    ///
    /// History and level-of-detail controllers belong to the old scene and
    /// are dropped.
    pub async fn load_scene(&mut self, path: &str) -> Result<(), SessionError> {
        let document = SceneDocument::load(self.source.as_ref(), path).await?;
        let graph = document.to_graph()?;

        self.commander.clear();
        self.lod.clear();
        self.state.graph = graph;
        self.state.notify(NodeId::ROOT, "children");
        Ok(())
    }

    /// Release history and cached assets
    pub fn shutdown(&mut self) {
        self.commander.clear();
        self.lod.clear();
        self.cache.clear();
        log::info!("Editor session shut down");
    }

    pub fn is_dirty(&self) -> bool {
        self.commander.is_dirty()
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("nodes", &self.state.graph.len())
            .field("commander", &self.commander)
            .field("cache", &self.cache)
            .field("lod", &self.lod)
            .finish()
    }
}

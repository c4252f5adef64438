//! Level of Detail (LOD)
//!
//! Distance-based switching between model variants with:
//! - A level table kept sorted by distance at insertion time
//! - Hysteresis: leaving the active level back towards the viewer requires
//!   crossing its threshold by more than `hysteresis * distance`
//! - Non-blocking swaps: the target variant is requested from the
//!   [`StreamingCache`] and polled once per frame; the previous visual stays
//!   until the new one is ready, then both are exchanged in one step
//!
//! # Example
//!
//! ```ignore
//! use atelier_scene::lod::{LodController, Viewer};
//!
//! let mut lod = LodController::new();
//! lod.add_level("models/tree_high.json", 0.0, 0.0)?;
//! lod.add_level("models/tree_mid.json", 10.0, 0.1)?;
//! lod.add_level("models/tree_low.json", 30.0, 0.1)?;
//!
//! // Once per frame
//! lod.update(tree, &viewer, &mut graph, &cache)?;
//! ```

use std::collections::BTreeMap;
use std::task::{Context, Poll};

use atelier_asset::{CacheError, Model, StreamingCache};
use atelier_core::NodeId;
use futures_util::future::BoxFuture;
use futures_util::task::noop_waker_ref;
use futures_util::FutureExt;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{NodeKind, SceneGraph};

// ============================================================================
// LOD Level
// ============================================================================

/// One entry of a level table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Cache key of the model variant
    pub asset_id: String,
    /// Viewer distance from which this level applies
    pub distance: f32,
    /// Fraction of `distance` the viewer must come back past before leaving
    /// this level again (0-1)
    pub hysteresis: f32,
}

impl LodLevel {
    /// Create a level, validating its thresholds
    pub fn new(asset_id: impl Into<String>, distance: f32, hysteresis: f32) -> Result<Self, LodError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(LodError::InvalidDistance(distance));
        }
        if !(0.0..=1.0).contains(&hysteresis) {
            return Err(LodError::InvalidHysteresis(hysteresis));
        }
        Ok(Self {
            asset_id: asset_id.into(),
            distance,
            hysteresis,
        })
    }
}

/// Viewer state read once per frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    pub position: Vec3,
    /// Zoom factor; distances are divided by it. Must be positive.
    pub zoom: f32,
}

impl Viewer {
    pub fn new(position: Vec3, zoom: f32) -> Self {
        Self { position, zoom }
    }

    /// Viewer at `position` with no zoom
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            zoom: 1.0,
        }
    }
}

/// LOD errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LodError {
    #[error("Viewer zoom must be positive and finite, got {0}")]
    InvalidZoom(f32),

    #[error("Level distance must be non-negative and finite, got {0}")]
    InvalidDistance(f32),

    #[error("Hysteresis must be within 0..=1, got {0}")]
    InvalidHysteresis(f32),

    #[error("Level {index} out of range ({len} levels)")]
    LevelOutOfRange { index: usize, len: usize },

    #[error("LOD node not found: {0}")]
    NodeNotFound(NodeId),
}

/// Outcome of one [`LodController::update`]
#[derive(Debug, Clone)]
pub enum LodUpdate {
    /// No levels; nothing to do
    Inert,
    /// The active level is still the right one
    Unchanged { level: usize },
    /// Waiting for the target level to load; the previous visual stays
    Loading { level: usize },
    /// The visual was swapped this frame
    Switched { from: Option<usize>, to: usize },
    /// The target level failed to load; retried on a later frame
    Failed { level: usize, error: CacheError },
}

// ============================================================================
// LOD Controller
// ============================================================================

struct PendingSwap {
    level: usize,
    load: BoxFuture<'static, Result<Model, CacheError>>,
}

/// Per-node level-of-detail state
#[derive(Default)]
pub struct LodController {
    levels: Vec<LodLevel>,
    active: Option<usize>,
    visual: Option<NodeId>,
    pending: Option<PendingSwap>,
}

impl LodController {
    /// Create a controller with no levels
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller from `(asset, distance, hysteresis)` entries
    pub fn from_levels<S: Into<String>>(
        levels: impl IntoIterator<Item = (S, f32, f32)>,
    ) -> Result<Self, LodError> {
        let mut controller = Self::new();
        for (asset, distance, hysteresis) in levels {
            controller.add_level(asset, distance, hysteresis)?;
        }
        Ok(controller)
    }

    /// Insert a level at its sorted position. Returns its index.
    ///
    /// A level with the same distance as an existing one goes after it.
    pub fn add_level(
        &mut self,
        asset_id: impl Into<String>,
        distance: f32,
        hysteresis: f32,
    ) -> Result<usize, LodError> {
        let level = LodLevel::new(asset_id, distance, hysteresis)?;
        let index = self.levels.partition_point(|l| l.distance <= distance);
        self.levels.insert(index, level);

        if let Some(active) = self.active.as_mut() {
            if *active >= index {
                *active += 1;
            }
        }
        if let Some(pending) = self.pending.as_mut() {
            if pending.level >= index {
                pending.level += 1;
            }
        }
        Ok(index)
    }

    /// Remove the level at `index`.
    ///
    /// Removing the active level keeps its visual on screen until the next
    /// update materialises a replacement.
    pub fn remove_level(&mut self, index: usize) -> Result<LodLevel, LodError> {
        if index >= self.levels.len() {
            return Err(LodError::LevelOutOfRange {
                index,
                len: self.levels.len(),
            });
        }
        let removed = self.levels.remove(index);

        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        if self.pending.as_ref().map_or(false, |p| p.level == index) {
            self.pending = None;
        } else if let Some(pending) = self.pending.as_mut() {
            if pending.level > index {
                pending.level -= 1;
            }
        }
        Ok(removed)
    }

    /// Level table, ascending by distance
    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    /// Index of the level currently on screen
    pub fn current_level(&self) -> Option<usize> {
        self.active
    }

    /// Node holding the current visual
    pub fn visual(&self) -> Option<NodeId> {
        self.visual
    }

    /// Whether a swap is waiting on the cache
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Level that should be shown at `distance`, or `None` without levels.
    ///
    /// Levels past the first are entered once `distance` reaches their
    /// threshold. The active level's own threshold is lowered by its
    /// hysteresis fraction, so the viewer has to come back further before
    /// the controller drops to the previous level.
    pub fn level_for_distance(&self, distance: f32) -> Option<usize> {
        if self.levels.is_empty() {
            return None;
        }
        let mut target = 0;
        for (index, level) in self.levels.iter().enumerate().skip(1) {
            let mut threshold = level.distance;
            if self.active == Some(index) {
                threshold -= threshold * level.hysteresis;
            }
            if distance < threshold {
                break;
            }
            target = index;
        }
        Some(target)
    }

    /// Per-frame step for `node`
    pub fn update(
        &mut self,
        node: NodeId,
        viewer: &Viewer,
        graph: &mut SceneGraph,
        cache: &StreamingCache<Model>,
    ) -> Result<LodUpdate, LodError> {
        if !viewer.zoom.is_finite() || viewer.zoom <= 0.0 {
            return Err(LodError::InvalidZoom(viewer.zoom));
        }
        let world = graph
            .world_position(node)
            .map_err(|_| LodError::NodeNotFound(node))?;
        let distance = viewer.position.distance(world) / viewer.zoom;

        if let Some(visual) = self.visual {
            if !matches!(graph.parent(visual), Ok(Some(parent)) if parent == node) {
                log::debug!("LOD {} lost its visual {}; reloading", node, visual);
                self.visual = None;
                self.active = None;
            }
        }

        let Some(target) = self.level_for_distance(distance) else {
            return Ok(LodUpdate::Inert);
        };
        if self.active == Some(target) {
            self.pending = None;
            return Ok(LodUpdate::Unchanged { level: target });
        }

        if self.pending.as_ref().map_or(false, |p| p.level != target) {
            log::debug!("LOD {} retargeted to level {}", node, target);
            self.pending = None;
        }
        let pending = self.pending.get_or_insert_with(|| PendingSwap {
            level: target,
            load: cache.load(&self.levels[target].asset_id),
        });

        let mut cx = Context::from_waker(noop_waker_ref());
        match pending.load.poll_unpin(&mut cx) {
            Poll::Pending => Ok(LodUpdate::Loading { level: target }),
            Poll::Ready(Ok(model)) => {
                self.pending = None;
                self.swap(node, target, model, graph)
            }
            Poll::Ready(Err(error)) => {
                self.pending = None;
                log::warn!("LOD {} level {} failed to load: {}", node, target, error);
                Ok(LodUpdate::Failed {
                    level: target,
                    error,
                })
            }
        }
    }

    fn swap(
        &mut self,
        node: NodeId,
        level: usize,
        model: Model,
        graph: &mut SceneGraph,
    ) -> Result<LodUpdate, LodError> {
        let name = format!("{} [lod {}]", model.name, level);
        let visual = graph
            .create_node(name, NodeKind::LodVisual { level }, node)
            .map_err(|_| LodError::NodeNotFound(node))?;
        if let Some(slot) = graph.get_mut(visual) {
            slot.model = Some(model);
        }

        if let Some(previous) = self.visual.replace(visual) {
            if graph.take_subtree(previous).is_err() {
                log::trace!("LOD visual {} was already gone", previous);
            }
        }
        let from = self.active.replace(level);
        log::debug!("LOD {} switched {:?} -> {}", node, from, level);
        Ok(LodUpdate::Switched { from, to: level })
    }

    /// Remove the current visual from the graph and forget the active level
    pub fn reset(&mut self, graph: &mut SceneGraph) {
        self.pending = None;
        self.active = None;
        if let Some(visual) = self.visual.take() {
            let _ = graph.take_subtree(visual);
        }
    }
}

impl std::fmt::Debug for LodController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LodController")
            .field("levels", &self.levels)
            .field("active", &self.active)
            .field("visual", &self.visual)
            .field("pending", &self.pending.as_ref().map(|p| p.level))
            .finish()
    }
}

// ============================================================================
// LOD System
// ============================================================================

/// Component table mapping nodes to their controllers
#[derive(Debug, Default)]
pub struct LodSystem {
    controllers: BTreeMap<NodeId, LodController>,
}

impl LodSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a controller to `node`, returning any previous one
    pub fn insert(&mut self, node: NodeId, controller: LodController) -> Option<LodController> {
        self.controllers.insert(node, controller)
    }

    pub fn remove(&mut self, node: NodeId) -> Option<LodController> {
        self.controllers.remove(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<&LodController> {
        self.controllers.get(&node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut LodController> {
        self.controllers.get_mut(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.controllers.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn clear(&mut self) {
        self.controllers.clear();
    }

    /// Nodes with a controller
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.controllers.keys().copied()
    }

    /// Run one frame for every controller whose node is in the graph.
    ///
    /// Controllers of removed nodes are kept, so an undo that restores the
    /// node also restores its level of detail.
    pub fn update_all(
        &mut self,
        viewer: &Viewer,
        graph: &mut SceneGraph,
        cache: &StreamingCache<Model>,
    ) -> Vec<(NodeId, Result<LodUpdate, LodError>)> {
        let mut results = Vec::with_capacity(self.controllers.len());
        for (node, controller) in self.controllers.iter_mut() {
            if !graph.contains(*node) {
                continue;
            }
            results.push((*node, controller.update(*node, viewer, graph, cache)));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LodController {
        LodController::from_levels([("high", 0.0, 0.0), ("mid", 10.0, 0.1), ("low", 30.0, 0.0)])
            .unwrap()
    }

    #[test]
    fn test_empty_table_has_no_level() {
        assert_eq!(LodController::new().level_for_distance(5.0), None);
    }

    #[test]
    fn test_levels_by_distance() {
        let lod = table();
        assert_eq!(lod.level_for_distance(0.0), Some(0));
        assert_eq!(lod.level_for_distance(9.99), Some(0));
        assert_eq!(lod.level_for_distance(10.0), Some(1));
        assert_eq!(lod.level_for_distance(29.0), Some(1));
        assert_eq!(lod.level_for_distance(1000.0), Some(2));
    }

    #[test]
    fn test_hysteresis_holds_active_level() {
        let mut lod = table();
        lod.active = Some(1);

        assert_eq!(lod.level_for_distance(9.5), Some(1));
        assert_eq!(lod.level_for_distance(9.0), Some(1));
        assert_eq!(lod.level_for_distance(8.0), Some(0));
    }

    #[test]
    fn test_add_level_keeps_sorted_order() {
        let mut lod = LodController::new();
        assert_eq!(lod.add_level("far", 50.0, 0.0), Ok(0));
        assert_eq!(lod.add_level("near", 0.0, 0.0), Ok(0));
        assert_eq!(lod.add_level("mid", 20.0, 0.2), Ok(1));
        assert_eq!(lod.add_level("mid-b", 20.0, 0.0), Ok(2));

        let ids: Vec<&str> = lod.levels().iter().map(|l| l.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "mid-b", "far"]);
    }

    #[test]
    fn test_add_and_remove_shift_active_index() {
        let mut lod = table();
        lod.active = Some(1);

        assert_eq!(lod.add_level("also-near", 0.0, 0.0), Ok(1));
        assert_eq!(lod.current_level(), Some(2));
        assert_eq!(lod.add_level("before-mid", 5.0, 0.0), Ok(2));
        assert_eq!(lod.current_level(), Some(3));
        assert_eq!(lod.add_level("beyond", 40.0, 0.0), Ok(5));
        assert_eq!(lod.current_level(), Some(3));

        lod.remove_level(0).unwrap();
        assert_eq!(lod.current_level(), Some(2));
        assert_eq!(lod.remove_level(2).unwrap().asset_id, "mid");
        assert_eq!(lod.current_level(), None);

        assert_eq!(
            lod.remove_level(7),
            Err(LodError::LevelOutOfRange { index: 7, len: 4 })
        );
    }

    #[test]
    fn test_level_validation() {
        let mut lod = LodController::new();
        assert_eq!(lod.add_level("a", -1.0, 0.0), Err(LodError::InvalidDistance(-1.0)));
        assert!(matches!(
            lod.add_level("a", f32::NAN, 0.0),
            Err(LodError::InvalidDistance(_))
        ));
        assert_eq!(lod.add_level("a", 1.0, 1.5), Err(LodError::InvalidHysteresis(1.5)));
        assert!(lod.levels().is_empty());
    }
}

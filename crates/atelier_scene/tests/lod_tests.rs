//! Level-of-detail integration tests

use std::sync::Arc;

use async_trait::async_trait;
use atelier_asset::{
    CacheConfig, FileSource, JsonLoader, MemorySource, Model, SourceError, StreamingCache,
};
use atelier_core::NodeId;
use atelier_scene::prelude::*;
use atelier_scene::LodError;
use glam::Vec3;
use tokio::sync::Semaphore;

fn model_json(name: &str) -> String {
    format!(r#"{{ "name": "{name}", "meshes": [], "materials": [] }}"#)
}

fn tree_source() -> Arc<MemorySource> {
    Arc::new(
        MemorySource::new()
            .with_file("tree_high.json", model_json("high"))
            .with_file("tree_mid.json", model_json("mid"))
            .with_file("tree_low.json", model_json("low")),
    )
}

fn model_cache(source: Arc<dyn FileSource>) -> StreamingCache<Model> {
    StreamingCache::new(Arc::new(JsonLoader::new(source)), CacheConfig::default())
}

fn tree_lod() -> LodController {
    LodController::from_levels([
        ("tree_high.json", 0.0, 0.0),
        ("tree_mid.json", 10.0, 0.1),
        ("tree_low.json", 30.0, 0.0),
    ])
    .unwrap()
}

fn viewer_at(distance: f32) -> Viewer {
    Viewer::at(Vec3::new(distance, 0.0, 0.0))
}

fn lod_visuals(graph: &SceneGraph, node: NodeId) -> Vec<String> {
    graph
        .children(node)
        .unwrap()
        .iter()
        .filter_map(|c| graph.get(*c))
        .filter(|n| n.kind.is_lod_visual())
        .filter_map(|n| n.model.as_ref().map(|m| m.name.clone()))
        .collect()
}

/// Source whose reads each consume one permit
struct GatedSource {
    inner: MemorySource,
    gate: Semaphore,
}

#[async_trait]
impl FileSource for GatedSource {
    async fn read_file(&self, path: &str) -> Result<String, SourceError> {
        self.gate
            .acquire()
            .await
            .map_err(|e| SourceError::Io {
                path: path.to_string(),
                message: e.to_string(),
            })?
            .forget();
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &str, data: &str) -> Result<(), SourceError> {
        self.inner.write_file(path, data).await
    }
}

#[test]
fn test_hysteresis_scenario() {
    let source = tree_source();
    let cache = model_cache(source.clone());
    let mut graph = SceneGraph::new();
    let tree = graph.create_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();
    let mut lod = tree_lod();

    let update = lod.update(tree, &viewer_at(9.0), &mut graph, &cache).unwrap();
    assert!(matches!(update, LodUpdate::Switched { from: None, to: 0 }));
    assert_eq!(lod_visuals(&graph, tree), vec!["high"]);

    let update = lod.update(tree, &viewer_at(11.0), &mut graph, &cache).unwrap();
    assert!(matches!(update, LodUpdate::Switched { from: Some(0), to: 1 }));
    assert_eq!(lod_visuals(&graph, tree), vec!["mid"]);

    let update = lod.update(tree, &viewer_at(9.5), &mut graph, &cache).unwrap();
    assert!(matches!(update, LodUpdate::Unchanged { level: 1 }));
    assert_eq!(lod.current_level(), Some(1));

    let update = lod.update(tree, &viewer_at(8.0), &mut graph, &cache).unwrap();
    assert!(matches!(update, LodUpdate::Switched { from: Some(1), to: 0 }));
    assert_eq!(lod_visuals(&graph, tree), vec!["high"]);

    assert_eq!(source.read_count(), 2);
    assert_eq!(graph.len(), 2);
}

#[test]
fn test_zoom_scales_distance() {
    let cache = model_cache(tree_source());
    let mut graph = SceneGraph::new();
    let tree = graph.create_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();
    let mut lod = tree_lod();

    let zoomed_in = Viewer::new(Vec3::new(40.0, 0.0, 0.0), 4.0);
    lod.update(tree, &zoomed_in, &mut graph, &cache).unwrap();
    assert_eq!(lod.current_level(), Some(1));

    let invalid = Viewer::new(Vec3::ZERO, 0.0);
    assert_eq!(
        lod.update(tree, &invalid, &mut graph, &cache).unwrap_err(),
        LodError::InvalidZoom(0.0)
    );
}

#[test]
fn test_previous_visual_stays_while_loading() {
    let gated = Arc::new(GatedSource {
        inner: MemorySource::new()
            .with_file("tree_high.json", model_json("high"))
            .with_file("tree_mid.json", model_json("mid"))
            .with_file("tree_low.json", model_json("low")),
        gate: Semaphore::new(0),
    });
    let cache = model_cache(gated.clone());
    let mut graph = SceneGraph::new();
    let tree = graph.create_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();
    let mut lod = tree_lod();

    let near = viewer_at(1.0);
    assert!(matches!(
        lod.update(tree, &near, &mut graph, &cache).unwrap(),
        LodUpdate::Loading { level: 0 }
    ));
    assert!(lod.visual().is_none());

    gated.gate.add_permits(1);
    assert!(matches!(
        lod.update(tree, &near, &mut graph, &cache).unwrap(),
        LodUpdate::Switched { from: None, to: 0 }
    ));
    let first_visual = lod.visual();

    let far = viewer_at(100.0);
    assert!(matches!(
        lod.update(tree, &far, &mut graph, &cache).unwrap(),
        LodUpdate::Loading { level: 2 }
    ));
    assert!(lod.is_loading());
    assert_eq!(lod.visual(), first_visual);
    assert_eq!(lod_visuals(&graph, tree), vec!["high"]);

    // Coming back before the far level arrives drops the stale request
    assert!(matches!(
        lod.update(tree, &near, &mut graph, &cache).unwrap(),
        LodUpdate::Unchanged { level: 0 }
    ));
    assert!(!lod.is_loading());
}

#[test]
fn test_failed_level_keeps_previous_visual_and_retries() {
    let source = Arc::new(MemorySource::new().with_file("tree_high.json", model_json("high")));
    let cache = model_cache(source.clone());
    let mut graph = SceneGraph::new();
    let tree = graph.create_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();
    let mut lod = tree_lod();

    lod.update(tree, &viewer_at(1.0), &mut graph, &cache).unwrap();
    let update = lod.update(tree, &viewer_at(15.0), &mut graph, &cache).unwrap();
    assert!(matches!(update, LodUpdate::Failed { level: 1, .. }));
    assert_eq!(lod.current_level(), Some(0));
    assert_eq!(lod_visuals(&graph, tree), vec!["high"]);

    source.insert("tree_mid.json", model_json("mid"));
    let update = lod.update(tree, &viewer_at(15.0), &mut graph, &cache).unwrap();
    assert!(matches!(update, LodUpdate::Switched { from: Some(0), to: 1 }));
    assert_eq!(lod_visuals(&graph, tree), vec!["mid"]);
}

#[test]
fn test_tiny_tables() {
    let cache = model_cache(tree_source());
    let mut graph = SceneGraph::new();
    let tree = graph.create_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();

    let mut empty = LodController::new();
    assert!(matches!(
        empty.update(tree, &viewer_at(5.0), &mut graph, &cache).unwrap(),
        LodUpdate::Inert
    ));

    let mut single = LodController::from_levels([("tree_low.json", 50.0, 0.0)]).unwrap();
    assert!(matches!(
        single.update(tree, &viewer_at(1.0), &mut graph, &cache).unwrap(),
        LodUpdate::Switched { from: None, to: 0 }
    ));
    for distance in [0.0, 49.0, 500.0] {
        assert!(matches!(
            single.update(tree, &viewer_at(distance), &mut graph, &cache).unwrap(),
            LodUpdate::Unchanged { level: 0 }
        ));
    }
}

#[test]
fn test_system_skips_nodes_outside_the_graph() {
    let cache = model_cache(tree_source());
    let mut graph = SceneGraph::new();
    let a = graph.create_node("a", NodeKind::Group, NodeId::ROOT).unwrap();
    let b = graph.create_node("b", NodeKind::Group, NodeId::ROOT).unwrap();

    let mut system = LodSystem::new();
    system.insert(a, tree_lod());
    system.insert(b, tree_lod());
    system.update_all(&viewer_at(1.0), &mut graph, &cache);

    let removed = graph.take_subtree(b).unwrap();
    let results = system.update_all(&viewer_at(20.0), &mut graph, &cache);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, a);
    assert!(system.contains(b));

    graph.restore_subtree(removed).unwrap();
    assert_eq!(lod_visuals(&graph, b), vec!["high"]);
    let results = system.update_all(&viewer_at(20.0), &mut graph, &cache);
    assert_eq!(results.len(), 2);
    assert_eq!(lod_visuals(&graph, b), vec!["mid"]);
}

#[test]
fn test_removed_visual_is_rebuilt() {
    let source = tree_source();
    let cache = model_cache(source.clone());
    let mut graph = SceneGraph::new();
    let tree = graph.create_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();
    let mut lod = tree_lod();

    lod.update(tree, &viewer_at(1.0), &mut graph, &cache).unwrap();
    let first = lod.visual().unwrap();
    graph.take_subtree(first).unwrap();
    assert!(lod_visuals(&graph, tree).is_empty());

    let update = lod.update(tree, &viewer_at(1.0), &mut graph, &cache).unwrap();
    assert!(matches!(update, LodUpdate::Switched { from: None, to: 0 }));
    assert_ne!(lod.visual(), Some(first));
    assert_eq!(lod_visuals(&graph, tree), vec!["high"]);
    assert_eq!(source.read_count(), 1);

    assert!(matches!(
        lod.update(tree, &viewer_at(1.0), &mut graph, &cache).unwrap(),
        LodUpdate::Unchanged { level: 0 }
    ));
}

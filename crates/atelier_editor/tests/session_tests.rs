//! Editor session integration tests

use std::sync::Arc;

use atelier_asset::{CacheConfig, MemorySource, SourceError};
use atelier_editor::prelude::*;
use atelier_editor::SessionError;
use atelier_scene::{DocumentError, LodController, LodUpdate};

fn model_json(name: &str) -> String {
    format!(r#"{{ "name": "{name}", "meshes": [], "materials": [] }}"#)
}

fn session_over(source: Arc<MemorySource>) -> EditorSession {
    let config = EditorConfig {
        history_limit: 5,
        cache: CacheConfig::with_capacity(4),
        ..Default::default()
    };
    EditorSession::new(config, source)
}

fn tree_source() -> Arc<MemorySource> {
    Arc::new(
        MemorySource::new()
            .with_file("tree_high.json", model_json("high"))
            .with_file("tree_low.json", model_json("low")),
    )
}

#[tokio::test]
async fn test_loaded_models_are_independent_copies() {
    let source = tree_source();
    let mut session = session_over(Arc::clone(&source));

    let a = session.load_model("tree_high.json", NodeId::ROOT).await.unwrap();
    let b = session.load_model("tree_high.json", NodeId::ROOT).await.unwrap();
    assert_eq!(source.read_count(), 1);

    let model_a = session.graph().get(a).unwrap().model.as_ref().unwrap();
    let model_b = session.graph().get(b).unwrap().model.as_ref().unwrap();
    assert_eq!(model_a, model_b);
    assert!(!std::ptr::eq(model_a, model_b));
    assert_eq!(
        session.graph().get(a).unwrap().kind,
        NodeKind::Model {
            asset: "tree_high.json".into()
        }
    );

    assert!(session.undo().unwrap());
    assert!(!session.graph().contains(b));
    assert!(session.redo().unwrap());
    assert!(session.graph().get(b).unwrap().model.is_some());
}

#[tokio::test]
async fn test_missing_model_adds_nothing() {
    let mut session = session_over(tree_source());

    let result = session.load_model("nope.json", NodeId::ROOT).await;
    assert!(matches!(result, Err(SessionError::Cache(_))));
    assert!(session.graph().is_empty());
    assert!(!session.can_undo());
}

#[tokio::test]
async fn test_save_and_load_scene_resets_history() {
    let source = tree_source();
    let mut session = session_over(Arc::clone(&source));

    let forest = session.add_node("forest", NodeKind::Group, NodeId::ROOT).unwrap();
    let tree = session.load_model("tree_low.json", forest).await.unwrap();
    session
        .execute(TranslateCommand::new(tree, Vec3::new(2.0, 0.0, 0.0)))
        .unwrap();
    assert!(session.is_dirty());

    session.save_scene("scenes/main.json").await.unwrap();
    assert!(!session.is_dirty());
    assert!(source.get("scenes/main.json").is_some());

    let mut other = session_over(Arc::clone(&source));
    let root_changes = other.watch(NodeId::ROOT, "children");
    root_changes.take_dirty();
    other.load_scene("scenes/main.json").await.unwrap();

    assert!(root_changes.take_dirty());
    assert!(!other.can_undo());
    assert_eq!(other.graph().len(), 2);
    assert_eq!(
        other.graph().world_position(tree).unwrap(),
        Vec3::new(2.0, 0.0, 0.0)
    );
    // Models are runtime state and are not persisted
    assert!(other.graph().get(tree).unwrap().model.is_none());

    let fresh = other.add_node("rock", NodeKind::Group, NodeId::ROOT).unwrap();
    assert!(fresh > tree);
}

#[tokio::test]
async fn test_loading_missing_scene_keeps_current_one() {
    let mut session = session_over(tree_source());
    session.add_node("forest", NodeKind::Group, NodeId::ROOT).unwrap();

    let result = session.load_scene("scenes/missing.json").await;
    assert!(matches!(
        result,
        Err(SessionError::Document(DocumentError::Source(SourceError::NotFound(_))))
    ));
    assert_eq!(session.graph().len(), 1);
    assert!(session.can_undo());
}

#[tokio::test]
async fn test_lod_follows_the_viewer() {
    let mut session = session_over(tree_source());
    let tree = session.add_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();
    let lod =
        LodController::from_levels([("tree_high.json", 0.0, 0.0), ("tree_low.json", 20.0, 0.1)])
            .unwrap();
    session.enable_lod(tree, lod).unwrap();
    let children = session.watch(tree, "children");
    children.take_dirty();

    let near = Viewer::at(Vec3::new(5.0, 0.0, 0.0));
    let far = Viewer::at(Vec3::new(50.0, 0.0, 0.0));

    // The first frame starts the load; a later frame picks it up
    let mut switched = None;
    for _ in 0..10 {
        if let Some((_, Ok(LodUpdate::Switched { to, .. }))) = session.tick(&near).pop() {
            switched = Some(to);
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(switched, Some(0));
    assert!(children.take_dirty());

    let mut switched = None;
    for _ in 0..10 {
        if let Some((_, Ok(LodUpdate::Switched { to, .. }))) = session.tick(&far).pop() {
            switched = Some(to);
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(switched, Some(1));
    assert_eq!(session.graph().children(tree).unwrap().len(), 1);

    // Visual swaps are not recorded in history
    assert_eq!(session.commander().undo_count(), 1);

    let controller = session.disable_lod(tree).unwrap();
    assert_eq!(controller.current_level(), None);
    assert!(session.graph().children(tree).unwrap().is_empty());
}

#[tokio::test]
async fn test_lod_rebuilds_deleted_visual() {
    let mut session = session_over(tree_source());
    let tree = session.add_node("tree", NodeKind::Group, NodeId::ROOT).unwrap();
    session
        .enable_lod(tree, LodController::from_levels([("tree_high.json", 0.0, 0.0)]).unwrap())
        .unwrap();

    let near = Viewer::at(Vec3::ZERO);
    let mut visual = None;
    for _ in 0..10 {
        session.tick(&near);
        visual = session.lod().get(tree).and_then(|lod| lod.visual());
        if visual.is_some() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let visual = visual.unwrap();

    session.execute(RemoveNodeCommand::new(visual)).unwrap();
    assert!(session.graph().children(tree).unwrap().is_empty());

    let results = session.tick(&near);
    assert!(matches!(
        results.as_slice(),
        [(_, Ok(LodUpdate::Switched { from: None, to: 0 }))]
    ));
    assert_eq!(session.graph().children(tree).unwrap().len(), 1);
}

#[test]
fn test_enable_lod_requires_node() {
    let mut session = session_over(tree_source());
    let result = session.enable_lod(NodeId::from_raw(77), LodController::new());
    assert!(matches!(result, Err(SessionError::Lod(_))));
}

#[tokio::test]
async fn test_history_limit_from_config() {
    let mut session = session_over(tree_source());
    let node = session.add_node("node", NodeKind::Group, NodeId::ROOT).unwrap();
    for _ in 0..10 {
        session.execute(TranslateCommand::new(node, Vec3::X)).unwrap();
    }
    assert_eq!(session.commander().undo_count(), 5);

    session.shutdown();
    assert!(!session.can_undo());
    assert!(session.cache().is_empty());
}

#[tokio::test]
async fn test_sessions_do_not_share_observers() {
    let source = tree_source();
    let mut first = session_over(Arc::clone(&source));
    let mut second = session_over(source);

    let a = first.add_node("a", NodeKind::Group, NodeId::ROOT).unwrap();
    let b = second.add_node("b", NodeKind::Group, NodeId::ROOT).unwrap();
    assert_eq!(a, b);

    let watch = first.watch(a, "position");
    watch.take_dirty();
    second.execute(TranslateCommand::new(b, Vec3::X)).unwrap();
    assert!(!watch.is_dirty());
}

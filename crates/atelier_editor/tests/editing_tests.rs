//! Command and history integration tests

use std::sync::Arc;

use atelier_editor::prelude::*;
use atelier_event::MutationEvent;
use parking_lot::Mutex;

/// forest -> [oak, pine], rock
fn sample_state() -> (EditorState, [NodeId; 4]) {
    let mut state = EditorState::default();
    let graph = &mut state.graph;
    let forest = graph.create_node("forest", NodeKind::Group, NodeId::ROOT).unwrap();
    let oak = graph.create_node("oak", NodeKind::Group, forest).unwrap();
    let pine = graph.create_node("pine", NodeKind::Group, forest).unwrap();
    let rock = graph.create_node("rock", NodeKind::Group, NodeId::ROOT).unwrap();
    graph.node_mut(oak).unwrap().transform.position = Vec3::new(1.0, 0.0, 3.0);
    graph
        .node_mut(pine)
        .unwrap()
        .properties
        .insert("height".into(), PropertyValue::Float(12.0));
    (state, [forest, oak, pine, rock])
}

fn recorder(state: &EditorState) -> (Arc<Mutex<Vec<MutationEvent>>>, atelier_event::Subscription) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let subscription = state.notifier.subscribe(move |event| sink.lock().push(event.clone()));
    (events, subscription)
}

fn paths(events: &Mutex<Vec<MutationEvent>>) -> Vec<(NodeId, String)> {
    events
        .lock()
        .iter()
        .map(|e| (e.target, e.path.as_str().to_string()))
        .collect()
}

#[test]
fn test_undo_all_restores_original_and_redo_all_reproduces_final() {
    let (mut state, [forest, oak, pine, rock]) = sample_state();
    let original = state.graph.clone();
    let mut history = Commander::new();

    let script: Vec<Box<dyn Command>> = vec![
        Box::new(TranslateCommand::many(vec![oak, pine], Vec3::new(0.1, 0.2, 0.3))),
        Box::new(RotateCommand::new(oak, Vec3::new(0.0, 1.3, 0.0))),
        Box::new(ScaleCommand::uniform(rock, 0.7)),
        Box::new(SetPropertyCommand::new(pine, "properties.height", 14.5)),
        Box::new(SetPropertyCommand::new(oak, "properties.age", 120_i64)),
        Box::new(SetPropertyCommand::new(rock, "position.y", -2.0)),
        Box::new(ReparentCommand::at_index(pine, rock, 0)),
        Box::new(DuplicateNodeCommand::new(forest)),
        Box::new(AddNodeCommand::new("bush", NodeKind::Group, rock)),
        Box::new(RemoveNodeCommand::new(oak)),
        Box::new(SetTransformCommand::new(
            forest,
            Transform::from_position(Vec3::new(5.0, 0.0, 5.0)),
        )),
    ];
    let count = script.len();

    for command in script {
        history.execute(command, &mut state).unwrap();
    }
    let edited = state.graph.clone();
    assert_ne!(edited, original);

    for _ in 0..count {
        assert!(history.undo(&mut state).unwrap());
    }
    assert!(!history.can_undo());
    assert_eq!(state.graph, original);

    for _ in 0..count {
        assert!(history.redo(&mut state).unwrap());
    }
    assert_eq!(state.graph, edited);
}

#[test]
fn test_translate_undo_is_exact() {
    let (mut state, [_, oak, ..]) = sample_state();
    let before = state.graph.get(oak).unwrap().transform;
    let mut history = Commander::new();

    for _ in 0..10 {
        history
            .execute(Box::new(TranslateCommand::new(oak, Vec3::splat(0.1))), &mut state)
            .unwrap();
    }
    while history.undo(&mut state).unwrap() {}

    assert_eq!(state.graph.get(oak).unwrap().transform, before);
}

#[test]
fn test_removed_subtree_comes_back_with_same_ids() {
    let (mut state, [forest, oak, pine, _]) = sample_state();
    let mut history = Commander::new();

    history
        .execute(Box::new(RemoveNodeCommand::new(forest)), &mut state)
        .unwrap();
    assert!(!state.graph.contains(forest));
    assert!(!state.graph.contains(oak));

    history.undo(&mut state).unwrap();
    assert_eq!(state.graph.children(forest).unwrap(), &[oak, pine]);
    assert_eq!(state.graph.children(NodeId::ROOT).unwrap()[0], forest);
}

#[test]
fn test_failed_command_leaves_history_untouched() {
    let (mut state, [forest, oak, ..]) = sample_state();
    let mut history = Commander::new();

    history
        .execute(Box::new(TranslateCommand::new(oak, Vec3::X)), &mut state)
        .unwrap();
    history.undo(&mut state).unwrap();
    let snapshot = state.graph.clone();

    let cycle = history.execute(Box::new(ReparentCommand::new(forest, oak)), &mut state);
    assert!(matches!(cycle, Err(CommandError::Graph(_))));

    let missing = history.execute(
        Box::new(TranslateCommand::new(NodeId::from_raw(404), Vec3::X)),
        &mut state,
    );
    assert_eq!(missing, Err(CommandError::NodeNotFound(NodeId::from_raw(404))));

    let root = history.execute(
        Box::new(SetPropertyCommand::new(NodeId::ROOT, "name", "world")),
        &mut state,
    );
    assert!(root.is_err());

    assert_eq!(state.graph, snapshot);
    assert_eq!(history.undo_count(), 0);
    assert_eq!(history.redo_description(), Some("Translate"));
}

#[test]
fn test_type_mismatch_is_rejected() {
    let (mut state, [_, oak, ..]) = sample_state();
    let mut command = SetPropertyCommand::new(oak, "visible", 3.0);

    assert!(command.execute(&mut state).is_err());
    assert!(command.undo(&mut state).is_err());
}

#[test]
fn test_edits_announce_most_specific_path() {
    let (mut state, [forest, oak, pine, rock]) = sample_state();
    let (events, _subscription) = recorder(&state);
    let mut history = Commander::new();

    history
        .execute(Box::new(SetPropertyCommand::new(oak, "position.x", 4.0)), &mut state)
        .unwrap();
    history
        .execute(Box::new(ScaleCommand::uniform(pine, 2.0)), &mut state)
        .unwrap();
    history
        .execute(Box::new(ReparentCommand::new(pine, rock)), &mut state)
        .unwrap();
    history
        .execute(
            Box::new(SetTransformCommand::new(
                rock,
                Transform::from_position(Vec3::Y),
            )),
            &mut state,
        )
        .unwrap();

    assert_eq!(
        paths(&events),
        vec![
            (oak, "position.x".to_string()),
            (pine, "scale".to_string()),
            (forest, "children".to_string()),
            (rock, "children".to_string()),
            (rock, "position".to_string()),
        ]
    );

    events.lock().clear();
    history.undo(&mut state).unwrap();
    assert_eq!(paths(&events), vec![(rock, "position".to_string())]);
}

#[test]
fn test_observers_only_see_overlapping_paths() {
    let (mut state, [_, oak, pine, _]) = sample_state();
    let position = state.notifier.watch(oak, "position");
    let properties = state.notifier.watch(oak, "properties");
    let other = state.notifier.watch(pine, "position");
    for watch in [&position, &properties, &other] {
        watch.take_dirty();
    }

    let mut history = Commander::new();
    history
        .execute(Box::new(SetPropertyCommand::new(oak, "properties.age", 3_i64)), &mut state)
        .unwrap();
    assert!(!position.is_dirty());
    assert!(properties.take_dirty());

    history
        .execute(Box::new(SetPropertyCommand::new(oak, "position.z", 1.0)), &mut state)
        .unwrap();
    assert!(position.take_dirty());
    assert!(!properties.is_dirty());
    assert!(!other.is_dirty());

    history.undo(&mut state).unwrap();
    assert_eq!(position.revision(), 2);
}

#[test]
fn test_history_limit_releases_each_evicted_command_once() {
    struct Counted {
        releases: Arc<Mutex<u32>>,
    }

    impl Command for Counted {
        fn description(&self) -> &str {
            "Counted"
        }

        fn execute(&mut self, _state: &mut EditorState) -> CommandResult {
            Ok(())
        }

        fn undo(&mut self, _state: &mut EditorState) -> CommandResult {
            Ok(())
        }

        fn release(&mut self) {
            *self.releases.lock() += 1;
        }
    }

    let mut state = EditorState::default();
    let mut history = Commander::with_max_size(3);
    let releases: Vec<Arc<Mutex<u32>>> = (0..5).map(|_| Arc::new(Mutex::new(0))).collect();

    for counter in &releases {
        history
            .execute(
                Box::new(Counted {
                    releases: Arc::clone(counter),
                }),
                &mut state,
            )
            .unwrap();
    }
    let counts: Vec<u32> = releases.iter().map(|c| *c.lock()).collect();
    assert_eq!(counts, vec![1, 1, 0, 0, 0]);
    assert_eq!(history.undo_count(), 3);

    history.clear();
    let counts: Vec<u32> = releases.iter().map(|c| *c.lock()).collect();
    assert_eq!(counts, vec![1, 1, 1, 1, 1]);
}

#[test]
fn test_group_is_one_history_entry() {
    let (mut state, [forest, oak, pine, _]) = sample_state();
    let original = state.graph.clone();
    let mut history = Commander::new();

    let group = CommandGroup::new("Plant Row")
        .with(TranslateCommand::many(vec![oak, pine], Vec3::Z))
        .with(DuplicateNodeCommand::new(pine))
        .with(SetPropertyCommand::new(forest, "name", "grove"));
    history.execute(Box::new(group), &mut state).unwrap();

    assert_eq!(history.undo_count(), 1);
    assert_eq!(history.undo_description(), Some("Plant Row"));
    assert_eq!(state.graph.children(forest).unwrap().len(), 3);
    assert_eq!(state.graph.get(forest).unwrap().name, "grove");

    history.undo(&mut state).unwrap();
    assert_eq!(state.graph, original);
}

#[test]
fn test_duplicate_is_placed_after_source_with_fresh_ids() {
    let (mut state, [forest, oak, pine, _]) = sample_state();
    let mut duplicate = DuplicateNodeCommand::new(oak);

    duplicate.execute(&mut state).unwrap();
    let copy = duplicate.copy().unwrap();

    assert_ne!(copy, oak);
    assert_eq!(state.graph.children(forest).unwrap(), &[oak, copy, pine]);
    assert_eq!(
        state.graph.get(copy).unwrap().transform,
        state.graph.get(oak).unwrap().transform
    );
}

//! Atelier headless editor
//!
//! Runs a scripted editing session without a window: builds a small scene,
//! streams models through the cache, flies a camera past a level-of-detail
//! node and exercises undo/redo, logging what happens.
//!
//! Run with: cargo run -p atelier_editor
//!       or: cargo run --bin atelier -- path/to/atelier.toml

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use atelier_asset::{FileSource, FsSource, Material, Mesh, Model};
use atelier_editor::prelude::*;
use atelier_scene::{LodController, LodUpdate};

const FRAME: Duration = Duration::from_millis(16);

const LOD_LEVELS: [(&str, f32, f32, u32); 3] = [
    ("models/tree_high.json", 0.0, 0.0, 32),
    ("models/tree_mid.json", 15.0, 0.1, 12),
    ("models/tree_low.json", 40.0, 0.1, 4),
];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let config = match EditorConfig::load(explicit.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("atelier: {}", e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();

    if let Err(e) = run(config).await {
        log::error!("Session failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: EditorConfig) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Asset root: {}", config.asset_root.display());
    let source: Arc<dyn FileSource> = Arc::new(FsSource::new(config.asset_root.clone()));
    write_demo_assets(source.as_ref()).await?;

    let mut session = EditorSession::new(config, source);

    let forest = session.add_node("forest", NodeKind::Group, NodeId::ROOT)?;
    let tree = session.load_model(LOD_LEVELS[0].0, forest).await?;
    let _title = session.observe(tree, "position", |event| {
        log::info!("Inspector: {} changed at '{}'", event.target, event.path);
    });

    session.execute(TranslateCommand::new(tree, Vec3::new(0.0, 0.0, -5.0)))?;
    session.execute(SetPropertyCommand::new(tree, "properties.species", "oak"))?;
    session.execute(ScaleCommand::uniform(tree, 1.5))?;

    let levels = LOD_LEVELS
        .iter()
        .map(|(asset, distance, hysteresis, _)| (*asset, *distance, *hysteresis));
    session.enable_lod(tree, LodController::from_levels(levels)?)?;

    fly_by(&mut session).await;

    while session.undo()? {}
    log::info!(
        "Undid everything: {} node(s) left, tree present: {}",
        session.graph().len(),
        session.graph().contains(tree)
    );
    while session.redo()? {}
    log::info!("Redid everything: {} node(s)", session.graph().len());

    session.save_scene("scenes/demo.json").await?;
    let stats = session.cache().stats();
    log::info!(
        "Cache: {} request(s), {} hit(s), {} miss(es), {} disposal(s)",
        stats.requests,
        stats.hits,
        stats.misses,
        stats.disposals
    );

    session.shutdown();
    Ok(())
}

/// Camera moving away from the origin and back
async fn fly_by(session: &mut EditorSession) {
    let outbound = (0..=60).map(|i| i as f32);
    let inbound = (0..=60).rev().map(|i| i as f32);

    for z in outbound.chain(inbound) {
        let viewer = Viewer::at(Vec3::new(0.0, 2.0, z));
        for (node, result) in session.tick(&viewer) {
            match result {
                Ok(LodUpdate::Switched { from, to }) => {
                    log::info!("Frame z={:>4}: {} switched {:?} -> {}", z, node, from, to)
                }
                Ok(LodUpdate::Failed { level, error }) => {
                    log::warn!("Frame z={:>4}: {} level {} failed: {}", z, node, level, error)
                }
                Ok(_) => {}
                Err(e) => log::error!("LOD update for {} failed: {}", node, e),
            }
        }
        tokio::time::sleep(FRAME).await;
    }
}

/// Write the demo tree models if the asset root does not have them yet
async fn write_demo_assets(source: &dyn FileSource) -> Result<(), Box<dyn std::error::Error>> {
    for (path, _, _, segments) in LOD_LEVELS {
        if source.read_file(path).await.is_ok() {
            continue;
        }
        let json = serde_json::to_string_pretty(&demo_tree(segments))?;
        source.write_file(path, &json).await?;
        log::info!("Wrote demo model {}", path);
    }
    Ok(())
}

/// A cone with `segments` sides
fn demo_tree(segments: u32) -> Model {
    let mut positions = vec![[0.0, 4.0, 0.0]];
    let mut indices = Vec::new();
    for i in 0..segments {
        let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
        positions.push([angle.cos() * 1.5, 1.0, angle.sin() * 1.5]);
        indices.extend_from_slice(&[0, i + 1, (i + 1) % segments + 1]);
    }

    Model {
        name: format!("tree ({} sides)", segments),
        meshes: vec![Mesh {
            name: "crown".into(),
            positions,
            indices,
            material: Some(0),
        }],
        materials: vec![Material {
            name: "leaves".into(),
            base_color: [0.2, 0.6, 0.25, 1.0],
            texture: None,
        }],
    }
}

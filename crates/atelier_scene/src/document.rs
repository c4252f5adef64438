//! Scene persistence
//!
//! A [`SceneDocument`] is the JSON form of a graph: a flat node list in
//! depth-first order, parents before children, so it can be rebuilt in one
//! pass. Runtime state (loaded models, level-of-detail visuals) is not
//! persisted.

use std::collections::BTreeMap;

use atelier_asset::{FileSource, SourceError};
use atelier_core::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{GraphError, NodeKind, PropertyValue, SceneGraph, SceneNode, Transform};

/// Document errors
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scene structure: {0}")]
    Graph(#[from] GraphError),

    #[error("Unsupported scene version {0}")]
    UnsupportedVersion(u32),
}

/// One persisted node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub parent: NodeId,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

fn default_visible() -> bool {
    true
}

/// Serialized scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub version: u32,
    pub nodes: Vec<NodeRecord>,
}

impl SceneDocument {
    /// Current format version
    pub const VERSION: u32 = 1;

    /// Capture the persistent part of `graph`
    pub fn from_graph(graph: &SceneGraph) -> Self {
        let mut nodes = Vec::new();
        let mut stack: Vec<NodeId> = graph
            .get(graph.root())
            .map(|root| root.children().iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(id) = stack.pop() {
            let Some(node) = graph.get(id) else {
                continue;
            };
            if node.kind.is_lod_visual() {
                continue;
            }
            nodes.push(NodeRecord {
                id,
                parent: node.parent().unwrap_or(NodeId::ROOT),
                name: node.name.clone(),
                kind: node.kind.clone(),
                transform: node.transform,
                visible: node.visible,
                properties: node.properties.clone(),
            });
            stack.extend(node.children().iter().rev().copied());
        }

        Self {
            version: Self::VERSION,
            nodes,
        }
    }

    /// Rebuild a graph. Parents must precede their children.
    pub fn to_graph(&self) -> Result<SceneGraph, DocumentError> {
        if self.version != Self::VERSION {
            return Err(DocumentError::UnsupportedVersion(self.version));
        }
        let mut graph = SceneGraph::new();
        for record in &self.nodes {
            if record.id.is_root() {
                return Err(GraphError::RootImmutable.into());
            }
            if !graph.contains(record.parent) {
                return Err(GraphError::NodeNotFound(record.parent).into());
            }
            let node = SceneNode {
                id: record.id,
                name: record.name.clone(),
                kind: record.kind.clone(),
                transform: record.transform,
                visible: record.visible,
                properties: record.properties.clone(),
                parent: None,
                children: Vec::new(),
                model: None,
            };
            graph.insert_unlinked(node)?;
            graph.attach(record.id, record.parent, None)?;
        }
        log::debug!("Rebuilt scene with {} nodes", graph.len());
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the document to `path`
    pub async fn save(&self, source: &dyn FileSource, path: &str) -> Result<(), DocumentError> {
        let json = self.to_json()?;
        source.write_file(path, &json).await?;
        log::info!("Saved scene to {} ({} nodes)", path, self.nodes.len());
        Ok(())
    }

    /// Read a document from `path`
    pub async fn load(source: &dyn FileSource, path: &str) -> Result<Self, DocumentError> {
        let json = source.read_file(path).await?;
        let document = Self::from_json(&json)?;
        log::info!("Loaded scene from {} ({} nodes)", path, document.nodes.len());
        Ok(document)
    }
}

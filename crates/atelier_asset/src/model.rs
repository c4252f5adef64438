//! Model asset
//!
//! The JSON-encoded mesh format placed into scenes. A base model lives in the
//! [`StreamingCache`](crate::StreamingCache); scene nodes always hold their
//! own copy.

use serde::{Deserialize, Serialize};

use crate::cache::CachedAsset;

/// A renderable model: meshes plus the materials they reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Display name
    pub name: String,
    /// Geometry
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    /// Materials, indexed by [`Mesh::material`]
    #[serde(default)]
    pub materials: Vec<Material>,
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Index into [`Model::materials`]
    #[serde(default)]
    pub material: Option<usize>,
}

/// Surface material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default = "Material::default_base_color")]
    pub base_color: [f32; 4],
    /// Texture path, resolved by the renderer
    #[serde(default)]
    pub texture: Option<String>,
}

impl Material {
    fn default_base_color() -> [f32; 4] {
        [1.0, 1.0, 1.0, 1.0]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: Self::default_base_color(),
            texture: None,
        }
    }
}

impl Model {
    /// Total vertex count across meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }

    /// Total triangle count across meshes
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }

    /// Textures referenced by materials
    pub fn textures(&self) -> impl Iterator<Item = &str> {
        self.materials.iter().filter_map(|m| m.texture.as_deref())
    }
}

impl CachedAsset for Model {
    fn deep_clone(&self) -> Self {
        self.clone()
    }

    fn dispose(&self) {
        log::debug!(
            "Disposing model '{}' ({} meshes, {} textures)",
            self.name,
            self.meshes.len(),
            self.textures().count()
        );
    }
}

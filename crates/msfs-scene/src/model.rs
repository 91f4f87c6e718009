//! Scene data model
//!
//! Plain data owned by a [`SceneRepository`](crate::SceneRepository). The
//! exporter only holds handles and borrows.

use std::path::{Path, PathBuf};

use msfs_core::{ImageId, MaterialId};
use serde::{Deserialize, Serialize};

/// Texture asset metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SceneImage {
    /// Display name
    pub name: String,
    /// Backing file, possibly stale
    pub filepath: PathBuf,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// Pixels are embedded in the scene rather than read from `filepath`
    pub packed: bool,
}

impl SceneImage {
    /// Path-backed image whose pixels have not been loaded yet
    pub fn unloaded(name: impl Into<String>, filepath: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            filepath: filepath.into(),
            width: 0,
            height: 0,
            channels: 0,
            packed: false,
        }
    }

    /// Both dimensions are non-zero
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Base file name of the backing path
    pub fn file_name(&self) -> Option<&str> {
        self.filepath.file_name().and_then(|n| n.to_str())
    }

    /// Backing file currently exists on disk
    pub fn path_resolves(&self) -> bool {
        !self.filepath.as_os_str().is_empty() && Path::new(&self.filepath).exists()
    }
}

/// Triangle mesh attached to an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Scene object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub mesh: Option<MeshData>,
    /// Material slots in order
    pub materials: Vec<MaterialId>,
}

/// Node inside a material's node tree
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderNode {
    pub name: String,
    pub kind: ShaderNodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShaderNodeKind {
    /// Image texture node, optionally without an assigned image
    ImageTexture(Option<ImageId>),
    /// Any other node type, by type name
    Other(String),
}

/// Material with an optional node tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    pub use_nodes: bool,
    pub nodes: Vec<ShaderNode>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            use_nodes: true,
            nodes: Vec::new(),
        }
    }

    /// Append an image texture node
    pub fn with_image_texture(mut self, node: impl Into<String>, image: ImageId) -> Self {
        self.nodes.push(ShaderNode {
            name: node.into(),
            kind: ShaderNodeKind::ImageTexture(Some(image)),
        });
        self
    }

    /// `(node name, image)` for every image texture node with an image assigned
    ///
    /// Empty when the node tree is disabled.
    pub fn image_textures(&self) -> impl Iterator<Item = (&str, ImageId)> + '_ {
        self.nodes
            .iter()
            .filter(|_| self.use_nodes)
            .filter_map(|node| match node.kind {
                ShaderNodeKind::ImageTexture(Some(image)) => Some((node.name.as_str(), image)),
                _ => None,
            })
    }
}

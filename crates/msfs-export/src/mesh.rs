//! Mesh export seam
//!
//! The pipeline only knows [`MeshExporter`]; the glTF writer in
//! [`crate::gltf`] is the default implementation.

use std::path::{Path, PathBuf};

use msfs_scene::{SceneError, SceneRepository};
use thiserror::Error;

/// Options handed to the mesh exporter for one call
#[derive(Debug, Clone, PartialEq)]
pub struct MeshExportOptions {
    /// Bake the scale factor into vertex positions
    pub apply_transforms: bool,
    pub export_texcoords: bool,
    pub export_normals: bool,
    pub draco_compression: bool,
    pub export_materials: bool,
    pub export_animations: bool,
    pub export_lights: bool,
    pub export_cameras: bool,
    /// Directory the material textures live in
    pub texture_dir: PathBuf,
    pub scale_factor: f32,
    pub pretty_json: bool,
}

impl MeshExportOptions {
    /// Fixed profile used for every LOD
    pub fn lod_profile(texture_dir: impl Into<PathBuf>, scale_factor: f32) -> Self {
        Self {
            apply_transforms: true,
            export_texcoords: true,
            export_normals: true,
            draco_compression: false,
            export_materials: true,
            export_animations: false,
            export_lights: false,
            export_cameras: false,
            texture_dir: texture_dir.into(),
            scale_factor,
            pretty_json: true,
        }
    }
}

impl Default for MeshExportOptions {
    fn default() -> Self {
        Self::lod_profile(msfs_core::config::TEXTURE_DIR_NAME, 1.0)
    }
}

/// What one export call wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshExportReport {
    pub files: Vec<PathBuf>,
    pub meshes: usize,
    pub vertices: usize,
}

/// Mesh export errors
#[derive(Error, Debug)]
pub enum MeshExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid mesh data in '{object}': {message}")]
    InvalidMeshData { object: String, message: String },

    #[error("Unsupported export option: {0}")]
    Unsupported(String),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Writes the current selection of a scene to disk
pub trait MeshExporter {
    /// Export every selected object to `output_path`
    fn export_selection(
        &mut self,
        scene: &dyn SceneRepository,
        output_path: &Path,
        options: &MeshExportOptions,
    ) -> Result<MeshExportReport, MeshExportError>;
}

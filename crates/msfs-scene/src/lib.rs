//! msfs-scene
//!
//! The exporter never reaches into a host application's global state. It is
//! handed a [`SceneRepository`] instead, which exposes exactly what the
//! pipeline reads and writes:
//!
//! | Capability | Methods |
//! |------------|---------|
//! | Collections | `collection_names`, `collection_objects` |
//! | Objects | `object`, `set_object_mesh` |
//! | Selection | `deselect_all`, `select`, `selected_objects` |
//! | Materials | `materials`, `material`, `image_usages` |
//! | Images | `images`, `image`, `set_image_path`, `reload_image`, `image_pixels` |
//!
//! [`InMemoryScene`] implements the trait for tests and for scenes described
//! by a JSON [`SceneDocument`].

pub mod document;
pub mod memory;
pub mod model;
pub mod pixels;
pub mod repository;

pub use document::SceneDocument;
pub use memory::InMemoryScene;
pub use model::{Material, MeshData, SceneImage, SceneObject, ShaderNode, ShaderNodeKind};
pub use pixels::PixelBuffer;
pub use repository::{ImageUsage, SceneRepository};

use std::path::PathBuf;

use msfs_core::{ImageId, MaterialId, ObjectId};
use thiserror::Error;

/// Scene access errors
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene document error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown image: {0}")]
    UnknownImage(ImageId),

    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    #[error("Unknown material: {0}")]
    UnknownMaterial(MaterialId),

    #[error("Image '{name}' has no pixel data loaded")]
    NotLoaded { name: String },

    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Pixel data length {actual} does not match {width}x{height}x{channels}")]
    PixelDataMismatch {
        width: u32,
        height: u32,
        channels: u8,
        actual: usize,
    },

    #[error("Invalid scene document: {0}")]
    InvalidDocument(String),
}

pub type SceneResult<T> = Result<T, SceneError>;

//! JSON scene documents
//!
//! A scene document lists images, materials, objects and collections, with
//! cross references by name:
//!
//! ```json
//! {
//!   "images": [{ "name": "wing_diffuse", "path": "textures/wing.jpg" }],
//!   "materials": [{ "name": "Paint", "textures": [{ "node": "Base Color", "image": "wing_diffuse" }] }],
//!   "objects": [{ "name": "LeftWing", "materials": ["Paint"],
//!                 "mesh": { "positions": [[0,0,0],[1,0,0],[0,1,0]], "indices": [0,1,2] } }],
//!   "collections": [{ "name": "Wing", "objects": ["LeftWing"] }]
//! }
//! ```
//!
//! Relative image paths resolve against the document's directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use msfs_core::{ImageId, MaterialId};
use serde::{Deserialize, Serialize};

use crate::memory::InMemoryScene;
use crate::model::{Material, MeshData, SceneObject, ShaderNode, ShaderNodeKind};
use crate::pixels::PixelBuffer;
use crate::{SceneError, SceneResult};

/// Root of a scene document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDocument {
    pub images: Vec<ImageDef>,
    pub materials: Vec<MaterialDef>,
    pub objects: Vec<ObjectDef>,
    pub collections: Vec<CollectionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDef {
    pub name: String,
    #[serde(default)]
    pub path: PathBuf,
    /// Embedded pixels; marks the image as packed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packed: Option<PackedPixels>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedPixels {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDef {
    pub name: String,
    #[serde(default = "default_use_nodes")]
    pub use_nodes: bool,
    #[serde(default)]
    pub textures: Vec<TextureNodeDef>,
}

fn default_use_nodes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureNodeDef {
    pub node: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    #[serde(default)]
    pub mesh: Option<MeshData>,
    #[serde(default)]
    pub materials: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDef {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

impl SceneDocument {
    pub fn from_json_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build an [`InMemoryScene`], resolving names and relative paths
    pub fn into_scene(self, base_dir: &Path) -> SceneResult<InMemoryScene> {
        let mut scene = InMemoryScene::new();

        let mut images: HashMap<String, ImageId> = HashMap::new();
        for def in self.images {
            let path = if def.path.as_os_str().is_empty() || def.path.is_absolute() {
                def.path
            } else {
                base_dir.join(def.path)
            };
            let id = match def.packed {
                Some(packed) => {
                    let pixels = PixelBuffer::new(packed.width, packed.height, packed.channels, packed.data)?;
                    scene.add_packed_image(def.name.clone(), path, pixels)
                }
                None => scene.add_image_from_file(def.name.clone(), path),
            };
            if images.insert(def.name.clone(), id).is_some() {
                return Err(SceneError::InvalidDocument(format!("duplicate image '{}'", def.name)));
            }
        }

        let mut materials: HashMap<String, MaterialId> = HashMap::new();
        for def in self.materials {
            let mut nodes = Vec::with_capacity(def.textures.len());
            for tex in def.textures {
                let image = match tex.image {
                    Some(name) => Some(*images.get(&name).ok_or_else(|| {
                        SceneError::InvalidDocument(format!(
                            "material '{}' references unknown image '{name}'",
                            def.name
                        ))
                    })?),
                    None => None,
                };
                nodes.push(ShaderNode {
                    name: tex.node,
                    kind: ShaderNodeKind::ImageTexture(image),
                });
            }
            let id = scene.add_material(Material {
                name: def.name.clone(),
                use_nodes: def.use_nodes,
                nodes,
            });
            materials.insert(def.name, id);
        }

        let mut objects = HashMap::new();
        for def in self.objects {
            let slots = def
                .materials
                .iter()
                .map(|name| {
                    materials.get(name).copied().ok_or_else(|| {
                        SceneError::InvalidDocument(format!(
                            "object '{}' references unknown material '{name}'",
                            def.name
                        ))
                    })
                })
                .collect::<SceneResult<Vec<_>>>()?;
            let id = scene.add_object(SceneObject {
                name: def.name.clone(),
                mesh: def.mesh,
                materials: slots,
            });
            objects.insert(def.name, id);
        }

        for def in self.collections {
            scene.add_collection(&def.name);
            for name in &def.objects {
                let id = objects.get(name).copied().ok_or_else(|| {
                    SceneError::InvalidDocument(format!(
                        "collection '{}' references unknown object '{name}'",
                        def.name
                    ))
                })?;
                scene.link(&def.name, id);
            }
        }

        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SceneRepository;

    const DOC: &str = r#"{
        "images": [
            { "name": "skin", "path": "skin.png" },
            { "name": "decal", "packed": { "width": 1, "height": 1, "channels": 4, "data": [1, 1, 1, 1] } }
        ],
        "materials": [
            { "name": "Paint", "textures": [
                { "node": "Base Color", "image": "skin" },
                { "node": "Decal", "image": "decal" },
                { "node": "Unassigned" }
            ] }
        ],
        "objects": [
            { "name": "LeftWing", "materials": ["Paint"],
              "mesh": { "positions": [[0,0,0],[1,0,0],[0,1,0]], "indices": [0,1,2] } },
            { "name": "Empty" }
        ],
        "collections": [ { "name": "Wing", "objects": ["LeftWing", "Empty"] }, { "name": "Spare" } ]
    }"#;

    #[test]
    fn test_document_into_scene() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::from_pixel(2, 2, image::Rgb([0, 128, 255]))
            .save(dir.path().join("skin.png"))
            .unwrap();

        let scene = SceneDocument::from_json_str(DOC).unwrap().into_scene(dir.path()).unwrap();

        assert_eq!(scene.collection_names(), vec!["Wing", "Spare"]);
        assert_eq!(scene.collection_objects("Wing").unwrap().len(), 2);
        assert_eq!(scene.collection_objects("Spare"), Some(vec![]));

        let skin = scene.image(ImageId(0)).unwrap();
        assert_eq!(skin.filepath, dir.path().join("skin.png"));
        assert_eq!((skin.width, skin.height), (2, 2));

        let decal = scene.image(ImageId(1)).unwrap();
        assert!(decal.packed);

        let paint = scene.material(MaterialId(0)).unwrap();
        assert_eq!(paint.image_textures().count(), 2);
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let doc = r#"{ "objects": [ { "name": "A", "materials": ["Nope"] } ] }"#;
        let err = SceneDocument::from_json_str(doc)
            .unwrap()
            .into_scene(Path::new("."))
            .unwrap_err();
        assert!(matches!(err, SceneError::InvalidDocument(_)));
    }

    #[test]
    fn test_packed_pixel_length_is_checked() {
        let doc = r#"{ "images": [ { "name": "bad", "packed": { "width": 2, "height": 2, "channels": 4, "data": [0] } } ] }"#;
        let err = SceneDocument::from_json_str(doc)
            .unwrap()
            .into_scene(Path::new("."))
            .unwrap_err();
        assert!(matches!(err, SceneError::PixelDataMismatch { .. }));
    }
}

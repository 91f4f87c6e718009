//! Scene repository trait
//!
//! The exporter takes `&mut dyn SceneRepository` for the whole run, which
//! gives it exclusive access to the scene until the run returns.

use std::path::PathBuf;

use msfs_core::{ImageId, MaterialId, ObjectId};

use crate::model::{Material, MeshData, SceneImage, SceneObject};
use crate::pixels::PixelBuffer;
use crate::SceneResult;

/// Where an image is referenced from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUsage {
    pub material: MaterialId,
    pub node: String,
}

/// Read/write access to the host scene graph
pub trait SceneRepository {
    /// Names of every collection in the scene
    fn collection_names(&self) -> Vec<String>;

    /// Objects linked to a collection, `None` if the collection does not exist
    fn collection_objects(&self, collection: &str) -> Option<Vec<ObjectId>>;

    fn object(&self, id: ObjectId) -> Option<&SceneObject>;

    /// Replace an object's geometry, used between LOD exports
    fn set_object_mesh(&mut self, id: ObjectId, mesh: MeshData) -> SceneResult<()>;

    fn deselect_all(&mut self);

    fn select(&mut self, id: ObjectId) -> SceneResult<()>;

    /// Currently selected objects in ascending handle order
    fn selected_objects(&self) -> Vec<ObjectId>;

    fn materials(&self) -> Vec<MaterialId>;

    fn material(&self, id: MaterialId) -> Option<&Material>;

    fn images(&self) -> Vec<ImageId>;

    fn image(&self, id: ImageId) -> Option<&SceneImage>;

    /// Rewrite an image's backing path without reloading it
    fn set_image_path(&mut self, id: ImageId, path: PathBuf) -> SceneResult<()>;

    /// Force-reload pixels from the backing store
    ///
    /// On failure the image is left with zero dimensions.
    fn reload_image(&mut self, id: ImageId) -> SceneResult<()>;

    /// Currently loaded pixels
    fn image_pixels(&self, id: ImageId) -> SceneResult<&PixelBuffer>;

    /// Every image texture node that references `id`
    fn image_usages(&self, id: ImageId) -> Vec<ImageUsage> {
        self.materials()
            .into_iter()
            .filter_map(|mid| self.material(mid).map(|m| (mid, m)))
            .flat_map(|(mid, material)| {
                material
                    .image_textures()
                    .filter(|(_, image)| *image == id)
                    .map(|(node, _)| ImageUsage {
                        material: mid,
                        node: node.to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

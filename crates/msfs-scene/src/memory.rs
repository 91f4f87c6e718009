//! In-memory scene repository

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use msfs_core::{ImageId, MaterialId, ObjectId};
use tracing::debug;

use crate::model::{Material, MeshData, SceneImage, SceneObject};
use crate::pixels::PixelBuffer;
use crate::repository::SceneRepository;
use crate::{SceneError, SceneResult};

#[derive(Debug, Clone)]
struct Collection {
    name: String,
    objects: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
struct ImageSlot {
    meta: SceneImage,
    pixels: Option<PixelBuffer>,
    /// Source of truth for packed images
    embedded: Option<PixelBuffer>,
    reloads: usize,
}

impl ImageSlot {
    fn set_pixels(&mut self, pixels: Option<PixelBuffer>) {
        match &pixels {
            Some(buf) => {
                self.meta.width = buf.width();
                self.meta.height = buf.height();
                self.meta.channels = buf.channels();
            }
            None => {
                self.meta.width = 0;
                self.meta.height = 0;
            }
        }
        self.pixels = pixels;
    }
}

/// Scene held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryScene {
    collections: Vec<Collection>,
    objects: Vec<SceneObject>,
    selected: BTreeSet<ObjectId>,
    materials: Vec<Material>,
    images: Vec<ImageSlot>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a scene described by a JSON [`SceneDocument`](crate::SceneDocument)
    pub fn load(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let document = crate::document::SceneDocument::from_json_file(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        document.into_scene(base_dir)
    }

    /// Register a path-backed image, decoding it eagerly
    ///
    /// A file that is missing or cannot be decoded leaves the image with
    /// zero dimensions, the same state a failed reload produces.
    pub fn add_image_from_file(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> ImageId {
        let meta = SceneImage::unloaded(name, path);
        let pixels = match PixelBuffer::load(&meta.filepath) {
            Ok(buf) => Some(buf),
            Err(e) => {
                debug!(image = %meta.name, error = %e, "Image not loaded");
                None
            }
        };
        self.add_image(meta, pixels)
    }

    /// Register an image with explicit metadata and (possibly stale) pixels
    ///
    /// Metadata is kept as given, so fakes can describe images whose
    /// dimensions disagree with what is loaded.
    pub fn add_image(&mut self, meta: SceneImage, pixels: Option<PixelBuffer>) -> ImageId {
        let mut meta = meta;
        if let Some(buf) = &pixels {
            if !meta.has_area() {
                meta.width = buf.width();
                meta.height = buf.height();
                meta.channels = buf.channels();
            }
        }
        let id = ImageId(self.images.len());
        self.images.push(ImageSlot {
            meta,
            pixels,
            embedded: None,
            reloads: 0,
        });
        id
    }

    /// Register an image whose pixels are embedded in the scene
    pub fn add_packed_image(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        pixels: PixelBuffer,
    ) -> ImageId {
        let mut meta = SceneImage::unloaded(name, path);
        meta.packed = true;
        let id = self.add_image(meta, Some(pixels.clone()));
        self.images[id.0].embedded = Some(pixels);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    /// Link an object into a collection, creating the collection if needed
    pub fn link(&mut self, collection: &str, object: ObjectId) {
        match self.collections.iter_mut().find(|c| c.name == collection) {
            Some(existing) => {
                if !existing.objects.contains(&object) {
                    existing.objects.push(object);
                }
            }
            None => self.collections.push(Collection {
                name: collection.to_string(),
                objects: vec![object],
            }),
        }
    }

    /// Create an empty collection
    pub fn add_collection(&mut self, name: &str) {
        if !self.collections.iter().any(|c| c.name == name) {
            self.collections.push(Collection {
                name: name.to_string(),
                objects: Vec::new(),
            });
        }
    }

    /// Number of times [`SceneRepository::reload_image`] ran for `id`
    pub fn reload_count(&self, id: ImageId) -> usize {
        self.images.get(id.0).map_or(0, |slot| slot.reloads)
    }

    fn slot_mut(&mut self, id: ImageId) -> SceneResult<&mut ImageSlot> {
        self.images.get_mut(id.0).ok_or(SceneError::UnknownImage(id))
    }
}

impl SceneRepository for InMemoryScene {
    fn collection_names(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.name.clone()).collect()
    }

    fn collection_objects(&self, collection: &str) -> Option<Vec<ObjectId>> {
        self.collections
            .iter()
            .find(|c| c.name == collection)
            .map(|c| c.objects.clone())
    }

    fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    fn set_object_mesh(&mut self, id: ObjectId, mesh: MeshData) -> SceneResult<()> {
        let object = self.objects.get_mut(id.0).ok_or(SceneError::UnknownObject(id))?;
        object.mesh = Some(mesh);
        Ok(())
    }

    fn deselect_all(&mut self) {
        self.selected.clear();
    }

    fn select(&mut self, id: ObjectId) -> SceneResult<()> {
        if id.0 >= self.objects.len() {
            return Err(SceneError::UnknownObject(id));
        }
        self.selected.insert(id);
        Ok(())
    }

    fn selected_objects(&self) -> Vec<ObjectId> {
        self.selected.iter().copied().collect()
    }

    fn materials(&self) -> Vec<MaterialId> {
        (0..self.materials.len()).map(MaterialId).collect()
    }

    fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    fn images(&self) -> Vec<ImageId> {
        (0..self.images.len()).map(ImageId).collect()
    }

    fn image(&self, id: ImageId) -> Option<&SceneImage> {
        self.images.get(id.0).map(|slot| &slot.meta)
    }

    fn set_image_path(&mut self, id: ImageId, path: PathBuf) -> SceneResult<()> {
        self.slot_mut(id)?.meta.filepath = path;
        Ok(())
    }

    fn reload_image(&mut self, id: ImageId) -> SceneResult<()> {
        let slot = self.slot_mut(id)?;
        slot.reloads += 1;

        if slot.meta.packed {
            let embedded = slot.embedded.clone();
            slot.set_pixels(embedded);
            return Ok(());
        }

        match PixelBuffer::load(&slot.meta.filepath) {
            Ok(buf) => {
                slot.set_pixels(Some(buf));
                Ok(())
            }
            Err(e) => {
                slot.set_pixels(None);
                Err(e)
            }
        }
    }

    fn image_pixels(&self, id: ImageId) -> SceneResult<&PixelBuffer> {
        let slot = self.images.get(id.0).ok_or(SceneError::UnknownImage(id))?;
        slot.pixels.as_ref().ok_or_else(|| SceneError::NotLoaded {
            name: slot.meta.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_collections_and_selection() {
        let mut scene = InMemoryScene::new();
        let a = scene.add_object(SceneObject { name: "a".into(), ..Default::default() });
        let b = scene.add_object(SceneObject { name: "b".into(), ..Default::default() });
        scene.link("Wing", a);
        scene.link("Wing", a);
        scene.link("Tail", b);

        assert_eq!(scene.collection_objects("Wing"), Some(vec![a]));
        assert_eq!(scene.collection_objects("Nose"), None);
        assert_eq!(scene.collection_names(), vec!["Wing", "Tail"]);

        scene.select(b).unwrap();
        scene.select(a).unwrap();
        assert_eq!(scene.selected_objects(), vec![a, b]);
        scene.deselect_all();
        assert!(scene.selected_objects().is_empty());
        assert!(scene.select(ObjectId(99)).is_err());
    }

    #[test]
    fn test_set_object_mesh() {
        let mut scene = InMemoryScene::new();
        let a = scene.add_object(SceneObject { name: "a".into(), ..Default::default() });
        let mesh = MeshData {
            positions: vec![[0.0; 3]; 3],
            indices: vec![0, 1, 2],
            ..Default::default()
        };

        scene.set_object_mesh(a, mesh.clone()).unwrap();
        assert_eq!(scene.object(a).unwrap().mesh, Some(mesh));
        assert!(matches!(
            scene.set_object_mesh(ObjectId(7), MeshData::default()),
            Err(SceneError::UnknownObject(_))
        ));
    }

    #[test]
    fn test_add_image_from_file_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "skin.png", 8, 4);

        let mut scene = InMemoryScene::new();
        let id = scene.add_image_from_file("skin", &path);
        let meta = scene.image(id).unwrap();
        assert_eq!((meta.width, meta.height, meta.channels), (8, 4, 4));

        std::fs::remove_file(&path).unwrap();
        assert!(scene.reload_image(id).is_err());
        assert!(!scene.image(id).unwrap().has_area());
        assert!(scene.image_pixels(id).is_err());
        assert_eq!(scene.reload_count(id), 1);
    }

    #[test]
    fn test_missing_file_leaves_zero_dimensions() {
        let mut scene = InMemoryScene::new();
        let id = scene.add_image_from_file("ghost", "/missing/ghost.png");
        assert!(!scene.image(id).unwrap().has_area());
        assert!(matches!(scene.image_pixels(id), Err(SceneError::NotLoaded { .. })));
    }

    #[test]
    fn test_packed_reload_keeps_embedded_pixels() {
        let mut scene = InMemoryScene::new();
        let id = scene.add_packed_image("decal", "", PixelBuffer::filled(2, 2, &[1.0, 0.0, 0.0, 1.0]));
        scene.reload_image(id).unwrap();
        assert_eq!(scene.image_pixels(id).unwrap().width(), 2);
        assert!(scene.image(id).unwrap().packed);
    }

    #[test]
    fn test_image_usages() {
        let mut scene = InMemoryScene::new();
        let img = scene.add_image(SceneImage::unloaded("wood", "/x/wood.png"), None);
        let other = scene.add_image(SceneImage::unloaded("metal", "/x/metal.png"), None);
        let m0 = scene.add_material(Material::new("Deck").with_image_texture("Base", img));
        let m1 = scene.add_material(
            Material::new("Rail")
                .with_image_texture("Rough", other)
                .with_image_texture("Base", img),
        );

        let usages = scene.image_usages(img);
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].material, m0);
        assert_eq!(usages[1].material, m1);
        assert_eq!(usages[1].node, "Base");
    }

    #[test]
    fn test_set_image_path() {
        let mut scene = InMemoryScene::new();
        let id = scene.add_image(SceneImage::unloaded("a", "/old/a.png"), None);
        scene.set_image_path(id, PathBuf::from("/new/a.png")).unwrap();
        assert_eq!(scene.image(id).unwrap().filepath, PathBuf::from("/new/a.png"));
        assert!(scene.set_image_path(ImageId(5), PathBuf::new()).is_err());
    }
}

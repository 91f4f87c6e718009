//! Texture normalization stage
//!
//! Walks every material's image texture nodes and writes one PNG per unique
//! image. A failed image gets exactly one force-reload and one retry; after
//! that it is skipped. Nothing here aborts an export.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use msfs_core::{ImageId, TextureResolution};
use msfs_scene::{SceneError, SceneImage, SceneRepository};
use tracing::{debug, info, warn};

use crate::textures::{
    resample_nearest, texture_file_name, write_png, TextureError, TextureResult,
};

/// Why an image was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Backing file missing and reload could not recover
    NotFound(PathBuf),
    /// No usable pixels
    InvalidImage(String),
    /// Resampling failed
    ResizeFailed(String),
    /// Encoding or writing the PNG failed
    WriteFailed(String),
}

impl From<&TextureError> for SkipReason {
    fn from(err: &TextureError) -> Self {
        match err {
            TextureError::NotFound(path) => SkipReason::NotFound(path.clone()),
            TextureError::InvalidImage(_)
            | TextureError::InvalidDimensions { .. }
            | TextureError::Scene(_) => SkipReason::InvalidImage(err.to_string()),
            TextureError::ResizeFailed(_) => SkipReason::ResizeFailed(err.to_string()),
            TextureError::Io(_) | TextureError::Image(_) | TextureError::UnsupportedChannels(_) => {
                SkipReason::WriteFailed(err.to_string())
            }
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotFound(path) => write!(f, "file not found: {}", path.display()),
            SkipReason::InvalidImage(msg)
            | SkipReason::ResizeFailed(msg)
            | SkipReason::WriteFailed(msg) => f.write_str(msg),
        }
    }
}

/// Outcome of one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureProcessingResult {
    Succeeded,
    RetriedAndSucceeded,
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct TextureOutcome {
    pub image: ImageId,
    pub name: String,
    /// PNG written, if any
    pub output: Option<PathBuf>,
    /// A reload-and-retry was attempted
    pub retried: bool,
    pub result: TextureProcessingResult,
}

/// Per-image outcomes of one normalization pass
#[derive(Debug, Clone, Default)]
pub struct NormalizationReport {
    pub outcomes: Vec<TextureOutcome>,
}

impl NormalizationReport {
    fn count(&self, f: impl Fn(&TextureProcessingResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.result)).count()
    }

    /// Succeeded on the first attempt
    pub fn succeeded(&self) -> usize {
        self.count(|r| *r == TextureProcessingResult::Succeeded)
    }

    /// Succeeded after reload
    pub fn retried(&self) -> usize {
        self.count(|r| *r == TextureProcessingResult::RetriedAndSucceeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, TextureProcessingResult::Skipped(_)))
    }

    /// PNG files written
    pub fn processed(&self) -> usize {
        self.succeeded() + self.retried()
    }

    /// Number of reload-and-retry attempts, successful or not
    pub fn retry_events(&self) -> usize {
        self.outcomes.iter().filter(|o| o.retried).count()
    }

    pub fn outcome(&self, image: ImageId) -> Option<&TextureOutcome> {
        self.outcomes.iter().find(|o| o.image == image)
    }
}

/// Resizes and re-encodes scene textures into the texture directory
#[derive(Debug, Clone)]
pub struct TextureNormalizer {
    texture_dir: PathBuf,
    size: u32,
}

impl TextureNormalizer {
    pub fn new(texture_dir: impl Into<PathBuf>, resolution: TextureResolution) -> Self {
        Self::with_size(texture_dir, resolution.pixels())
    }

    /// Normalizer with an arbitrary square size
    pub fn with_size(texture_dir: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            texture_dir: texture_dir.into(),
            size,
        }
    }

    pub fn texture_dir(&self) -> &Path {
        &self.texture_dir
    }

    /// `<textureDir>/<sanitized name>.png`
    pub fn output_path(&self, image: &SceneImage) -> PathBuf {
        self.texture_dir.join(texture_file_name(&image.name))
    }

    /// Unique images referenced by image texture nodes, in material order
    pub fn collect_images(scene: &dyn SceneRepository) -> Vec<ImageId> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();
        for material_id in scene.materials() {
            let Some(material) = scene.material(material_id) else {
                continue;
            };
            for (node, image) in material.image_textures() {
                debug!(material = %material.name, node = %node, image = %image, "Found image texture");
                if seen.insert(image) {
                    images.push(image);
                }
            }
        }
        images
    }

    /// Process every unique material image
    pub fn normalize_all(&self, scene: &mut dyn SceneRepository) -> NormalizationReport {
        let images = Self::collect_images(&*scene);
        info!(count = images.len(), size = self.size, dir = %self.texture_dir.display(), "Normalizing textures");

        let mut report = NormalizationReport::default();
        let mut written: HashSet<PathBuf> = HashSet::new();
        for id in images {
            let outcome = self.process_image(scene, id);
            if let Some(path) = &outcome.output {
                if !written.insert(path.clone()) {
                    warn!(image = %outcome.name, path = %path.display(), "Texture name collides with an earlier image; file overwritten");
                }
            }
            report.outcomes.push(outcome);
        }

        info!(
            succeeded = report.succeeded(),
            retried = report.retried(),
            skipped = report.skipped(),
            "Texture normalization complete"
        );
        report
    }

    /// Process one image with a single reload-and-retry on failure
    pub fn process_image(&self, scene: &mut dyn SceneRepository, id: ImageId) -> TextureOutcome {
        let name = match scene.image(id) {
            Some(image) => {
                debug!(
                    image = %image.name,
                    path = %image.filepath.display(),
                    width = image.width,
                    height = image.height,
                    channels = image.channels,
                    "Processing texture"
                );
                image.name.clone()
            }
            None => {
                let err = TextureError::Scene(SceneError::UnknownImage(id));
                warn!(image = %id, error = %err, "Skipping texture");
                return TextureOutcome {
                    image: id,
                    name: id.to_string(),
                    output: None,
                    retried: false,
                    result: TextureProcessingResult::Skipped(SkipReason::from(&err)),
                };
            }
        };

        let first_error = match self.attempt(&*scene, id, true) {
            Ok(path) => {
                return TextureOutcome {
                    image: id,
                    name,
                    output: Some(path),
                    retried: false,
                    result: TextureProcessingResult::Succeeded,
                };
            }
            Err(e) => e,
        };

        warn!(image = %name, error = %first_error, "Failed to process texture");
        info!(image = %name, "Attempting to reload the image");
        if let Err(e) = scene.reload_image(id) {
            debug!(image = %name, error = %e, "Reload failed");
        }

        let has_area = scene.image(id).is_some_and(SceneImage::has_area);
        if !has_area {
            warn!(image = %name, "Image still has invalid dimensions after reload");
            return TextureOutcome {
                image: id,
                name,
                output: None,
                retried: false,
                result: TextureProcessingResult::Skipped(SkipReason::from(&first_error)),
            };
        }

        info!(image = %name, "Image reloaded, retrying resize");
        match self.attempt(&*scene, id, false) {
            Ok(path) => TextureOutcome {
                image: id,
                name,
                output: Some(path),
                retried: true,
                result: TextureProcessingResult::RetriedAndSucceeded,
            },
            Err(retry_error) => {
                warn!(image = %name, error = %retry_error, "Retry failed, skipping texture");
                TextureOutcome {
                    image: id,
                    name,
                    output: None,
                    retried: true,
                    result: TextureProcessingResult::Skipped(SkipReason::from(&retry_error)),
                }
            }
        }
    }

    /// Validate, resample and write one image
    ///
    /// The resized buffer is dropped before this returns.
    fn attempt(&self, scene: &dyn SceneRepository, id: ImageId, verify_source: bool) -> TextureResult<PathBuf> {
        let image = scene
            .image(id)
            .ok_or(TextureError::Scene(SceneError::UnknownImage(id)))?;

        if verify_source && !image.path_resolves() {
            return Err(TextureError::NotFound(image.filepath.clone()));
        }
        if !image.has_area() {
            return Err(TextureError::InvalidDimensions {
                width: image.width,
                height: image.height,
            });
        }

        let pixels = scene
            .image_pixels(id)
            .map_err(|e| TextureError::InvalidImage(e.to_string()))?;
        let resized = resample_nearest(pixels, self.size)?;

        let output = self.output_path(image);
        write_png(&resized, &output)?;
        debug!(image = %image.name, path = %output.display(), "Resized image saved");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msfs_scene::{InMemoryScene, Material, PixelBuffer};

    fn save_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(w, h, image::Rgba([200, 100, 50, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_success_writes_png_at_target_size() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let path = save_png(src.path(), "hull.png", 5, 3);

        let mut scene = InMemoryScene::new();
        let id = scene.add_image_from_file("hull", &path);
        scene.add_material(Material::new("Hull").with_image_texture("Base Color", id));

        let report = TextureNormalizer::with_size(out.path(), 8).normalize_all(&mut scene);

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.retry_events(), 0);
        let written = out.path().join("hull.png");
        assert_eq!(report.outcome(id).unwrap().output.as_deref(), Some(written.as_path()));
        assert_eq!(image::image_dimensions(&written).unwrap(), (8, 8));
        assert_eq!(scene.reload_count(id), 0);
    }

    #[test]
    fn test_missing_file_is_skipped_with_not_found() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let good = save_png(src.path(), "good.png", 2, 2);

        let mut scene = InMemoryScene::new();
        let missing = scene.add_image_from_file("missing", src.path().join("missing.png"));
        let present = scene.add_image_from_file("good", &good);
        scene.add_material(
            Material::new("Mixed")
                .with_image_texture("A", missing)
                .with_image_texture("B", present),
        );

        let report = TextureNormalizer::with_size(out.path(), 4).normalize_all(&mut scene);

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(
            report.outcome(missing).unwrap().result,
            TextureProcessingResult::Skipped(SkipReason::NotFound(src.path().join("missing.png")))
        );
        assert_eq!(report.outcome(present).unwrap().result, TextureProcessingResult::Succeeded);
        assert_eq!(scene.reload_count(missing), 1);
        assert!(out.path().join("good.png").exists());
        assert!(!out.path().join("missing.png").exists());
    }

    #[test]
    fn test_stale_pixels_recover_after_one_reload() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let path = save_png(src.path(), "flap.png", 4, 4);

        // Metadata claims a size but nothing is loaded yet
        let mut meta = SceneImage::unloaded("flap", &path);
        meta.width = 4;
        meta.height = 4;
        meta.channels = 4;

        let mut scene = InMemoryScene::new();
        let id = scene.add_image(meta, None);
        scene.add_material(Material::new("Flap").with_image_texture("Base Color", id));

        let report = TextureNormalizer::with_size(out.path(), 16).normalize_all(&mut scene);

        let outcome = report.outcome(id).unwrap();
        assert_eq!(outcome.result, TextureProcessingResult::RetriedAndSucceeded);
        assert_eq!(report.retry_events(), 1);
        assert_eq!(scene.reload_count(id), 1);

        let pngs: Vec<_> = std::fs::read_dir(out.path()).unwrap().flatten().collect();
        assert_eq!(pngs.len(), 1);
        assert_eq!(image::image_dimensions(out.path().join("flap.png")).unwrap(), (16, 16));
    }

    #[test]
    fn test_packed_image_recovers_through_retry() {
        let out = tempfile::tempdir().unwrap();
        let mut scene = InMemoryScene::new();
        let id = scene.add_packed_image("decal", "/gone/decal.png", PixelBuffer::filled(2, 2, &[0.0, 1.0, 0.0]));
        scene.add_material(Material::new("Decal").with_image_texture("Base Color", id));

        let report = TextureNormalizer::with_size(out.path(), 4).normalize_all(&mut scene);
        assert_eq!(report.retried(), 1);
        assert!(out.path().join("decal.png").exists());
    }

    #[test]
    fn test_unique_images_processed_once() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let path = save_png(src.path(), "shared.png", 2, 2);

        let mut scene = InMemoryScene::new();
        let id = scene.add_image_from_file("shared", &path);
        scene.add_material(Material::new("A").with_image_texture("Base", id));
        scene.add_material(Material::new("B").with_image_texture("Base", id));

        let mut disabled = Material::new("C").with_image_texture("Base", id);
        disabled.use_nodes = false;
        scene.add_material(disabled);

        assert_eq!(TextureNormalizer::collect_images(&scene), vec![id]);
        let report = TextureNormalizer::with_size(out.path(), 2).normalize_all(&mut scene);
        assert_eq!(report.outcomes.len(), 1);
    }

    #[test]
    fn test_second_failure_is_permanent() {
        let src = tempfile::tempdir().unwrap();
        let path = save_png(src.path(), "ok.png", 2, 2);

        let mut scene = InMemoryScene::new();
        let id = scene.add_image_from_file("ok", &path);
        scene.add_material(Material::new("M").with_image_texture("Base", id));

        // Output directory does not exist, so both writes fail
        let report = TextureNormalizer::with_size(src.path().join("no/such/dir"), 2).normalize_all(&mut scene);

        let outcome = report.outcome(id).unwrap();
        assert!(outcome.retried);
        assert!(matches!(outcome.result, TextureProcessingResult::Skipped(SkipReason::WriteFailed(_))));
        assert_eq!(scene.reload_count(id), 1);
    }
}

//! Export orchestration
//!
//! One run drives the scene through a fixed sequence of stages:
//!
//! ```text
//! Idle -> ConfigValidated -> PathsRepaired -> ObjectsSelected
//!      -> LodExported(0..=N) -> ManifestWritten -> TexturesProcessed
//!      -> Cleaned -> Done
//! ```
//!
//! Configuration and mesh export errors move the run to `Failed` and are
//! returned. Path repair and texture problems are reported in the
//! [`ExportSummary`] instead.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use msfs_core::{Error, ExportConfiguration, ObjectId, Result, ResultExt};
use msfs_scene::SceneRepository;
use tracing::{debug, error, info, warn};

use crate::decimate::{Decimator, NoopDecimator};
use crate::gltf::GltfExporter;
use crate::logging::timed;
use crate::manifest::generate_manifest;
use crate::mesh::{MeshExportOptions, MeshExporter};
use crate::repair::{PathRepairer, RepairReport};
use crate::textures::{NormalizationReport, TextureNormalizer};

/// Stage of an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Idle,
    ConfigValidated,
    PathsRepaired,
    ObjectsSelected,
    LodExported(u8),
    ManifestWritten,
    TexturesProcessed,
    Cleaned,
    Done,
    Failed,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStage::LodExported(i) => write!(f, "LodExported({i})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub collection: String,
    /// One model file per LOD, in LOD order
    pub model_files: Vec<PathBuf>,
    /// `None` when manifest generation is disabled
    pub manifest: Option<PathBuf>,
    pub repair: RepairReport,
    pub textures: NormalizationReport,
    /// Scratch files deleted from the texture directory
    pub removed_files: Vec<PathBuf>,
    /// Every stage entered, in order
    pub stages: Vec<ExportStage>,
}

/// Runs a full export of one collection
pub struct ExportPipeline {
    config: ExportConfiguration,
    exporter: Box<dyn MeshExporter>,
    decimator: Box<dyn Decimator>,
    stage: ExportStage,
    history: Vec<ExportStage>,
}

impl ExportPipeline {
    /// Pipeline with the glTF exporter and no LOD reduction
    pub fn new(config: ExportConfiguration) -> Self {
        Self {
            config,
            exporter: Box::new(GltfExporter::new()),
            decimator: Box::new(NoopDecimator),
            stage: ExportStage::Idle,
            history: Vec::new(),
        }
    }

    pub fn with_exporter(mut self, exporter: Box<dyn MeshExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_decimator(mut self, decimator: Box<dyn Decimator>) -> Self {
        self.decimator = decimator;
        self
    }

    pub fn config(&self) -> &ExportConfiguration {
        &self.config
    }

    /// Current stage; `Done` or `Failed` once `run` returns
    pub fn stage(&self) -> ExportStage {
        self.stage
    }

    /// Stages entered during the last run
    pub fn history(&self) -> &[ExportStage] {
        &self.history
    }

    fn advance(&mut self, stage: ExportStage) {
        info!(collection = %self.config.collection, %stage, "Export stage");
        self.stage = stage;
        self.history.push(stage);
    }

    /// Run the export against `scene`
    pub fn run(&mut self, scene: &mut dyn SceneRepository) -> Result<ExportSummary> {
        self.stage = ExportStage::Idle;
        self.history = vec![ExportStage::Idle];

        match self.run_stages(scene) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(collection = %self.config.collection, stage = %self.stage, error = %e, "Export failed");
                self.advance(ExportStage::Failed);
                Err(e)
            }
        }
    }

    fn run_stages(&mut self, scene: &mut dyn SceneRepository) -> Result<ExportSummary> {
        let objects = self.validate(scene)?;
        self.advance(ExportStage::ConfigValidated);

        let repairer = PathRepairer::new(self.config.path_repair.clone());
        let repair = timed("repair", || repairer.repair_all(&mut *scene));
        self.advance(ExportStage::PathsRepaired);

        let model_files = self.export_lods(scene, &objects)?;

        let manifest = if self.config.generate_manifest {
            let path = generate_manifest(&self.config.asset_base_path(), &self.config)?;
            self.advance(ExportStage::ManifestWritten);
            Some(path)
        } else {
            debug!("Manifest generation disabled");
            None
        };

        let texture_dir = self.config.texture_dir();
        let normalizer = TextureNormalizer::new(&texture_dir, self.config.texture_resolution);
        let textures = timed("textures", || normalizer.normalize_all(&mut *scene));
        self.advance(ExportStage::TexturesProcessed);

        let removed_files = cleanup_texture_dir(&texture_dir)
            .map_err(Error::from)
            .with_context(|| format!("cleaning {}", texture_dir.display()))?;
        self.advance(ExportStage::Cleaned);

        self.advance(ExportStage::Done);
        info!(
            collection = %self.config.collection,
            lods = model_files.len(),
            repaired = repair.repaired_count(),
            textures = textures.processed(),
            retried = textures.retried(),
            skipped = textures.skipped(),
            "Export finished"
        );

        Ok(ExportSummary {
            collection: self.config.collection.clone(),
            model_files,
            manifest,
            repair,
            textures,
            removed_files,
            stages: self.history.clone(),
        })
    }

    /// Check the configuration against the scene and create output directories
    fn validate(&self, scene: &dyn SceneRepository) -> Result<Vec<ObjectId>> {
        self.config.validate()?;

        let objects = scene
            .collection_objects(&self.config.collection)
            .ok_or_else(|| Error::CollectionNotFound {
                name: self.config.collection.clone(),
            })?;

        for dir in [self.config.collection_dir(), self.config.texture_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(Error::from)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(objects)
    }

    fn export_lods(&mut self, scene: &mut dyn SceneRepository, objects: &[ObjectId]) -> Result<Vec<PathBuf>> {
        let options = MeshExportOptions::lod_profile(self.config.texture_dir(), self.config.scale_factor);
        let mut files = Vec::new();

        for lod in self.config.lod_levels.indices() {
            scene.deselect_all();
            for &id in objects {
                scene.select(id).map_err(|e| Error::internal(e.to_string()))?;
            }
            if lod == 0 {
                self.advance(ExportStage::ObjectsSelected);
            }

            let path = self.config.lod_path(lod);
            let report = self
                .exporter
                .export_selection(&*scene, &path, &options)
                .map_err(|e| Error::MeshExport {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            debug!(lod, files = report.files.len(), vertices = report.vertices, "LOD written");
            self.advance(ExportStage::LodExported(lod));

            debug!(lod, decimator = self.decimator.name(), "Reducing geometry");
            self.decimator.reduce(scene, objects, lod)?;
            files.push(path);
        }
        Ok(files)
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Delete every non-PNG file directly inside `dir`
///
/// Sub-directories are left alone. A file that cannot be deleted is logged
/// and skipped; failing to list `dir` is an error.
pub fn cleanup_texture_dir(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Could not read directory entry");
                continue;
            }
        };
        if !path.is_file() || is_png(&path) {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed scratch file");
                removed.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove file"),
        }
    }

    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_png_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.PNG", "c.jpg", "d.tga", "notes"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let removed = cleanup_texture_dir(dir.path()).unwrap();

        assert_eq!(
            removed,
            vec![dir.path().join("c.jpg"), dir.path().join("d.tga"), dir.path().join("notes")]
        );
        assert!(dir.path().join("a.png").exists());
        assert!(dir.path().join("b.PNG").exists());
        assert!(dir.path().join("sub.jpg").is_dir());
    }

    #[test]
    fn test_cleanup_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cleanup_texture_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(ExportStage::LodExported(2).to_string(), "LodExported(2)");
        assert_eq!(ExportStage::ConfigValidated.to_string(), "ConfigValidated");
    }
}

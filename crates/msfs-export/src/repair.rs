//! Texture path repair
//!
//! Scenes moved between machines often reference textures under a stale
//! absolute path. For each image whose file is missing, the path is cut at a
//! landmark directory (by default `Downloads`) plus the next `depth`
//! components, and that root is searched recursively for a file with the
//! image's base name. Best effort: misses are reported, never raised.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use msfs_core::{AmbiguityPolicy, ImageId, PathRepairSettings};
use msfs_scene::SceneRepository;
use tracing::{debug, info, warn};

/// A path that was rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedPath {
    pub image: ImageId,
    pub name: String,
    pub old: PathBuf,
    pub new: PathBuf,
}

/// Why an image path could not be repaired
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairMiss {
    /// Path has no file name component
    NoFileName { image: ImageId, path: PathBuf },
    /// Landmark directory is not part of the path
    NoLandmark { image: ImageId, path: PathBuf },
    /// Nothing with the same name under the candidate root
    NoMatch { image: ImageId, root: PathBuf },
    /// Several files matched and the policy requires a unique match
    Ambiguous { image: ImageId, root: PathBuf, matches: usize },
    /// The scene refused the new path
    Rejected { image: ImageId, message: String },
}

impl RepairMiss {
    pub fn image(&self) -> ImageId {
        match self {
            RepairMiss::NoFileName { image, .. }
            | RepairMiss::NoLandmark { image, .. }
            | RepairMiss::NoMatch { image, .. }
            | RepairMiss::Ambiguous { image, .. }
            | RepairMiss::Rejected { image, .. } => *image,
        }
    }
}

/// Result of one repair pass
#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    /// Images whose path did not resolve
    pub checked: usize,
    pub repaired: Vec<RepairedPath>,
    pub misses: Vec<RepairMiss>,
}

impl RepairReport {
    pub fn repaired_count(&self) -> usize {
        self.repaired.len()
    }

    pub fn miss_count(&self) -> usize {
        self.misses.len()
    }
}

/// Applies [`PathRepairSettings`] to a scene
#[derive(Debug, Clone, Default)]
pub struct PathRepairer {
    settings: PathRepairSettings,
}

impl PathRepairer {
    pub fn new(settings: PathRepairSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PathRepairSettings {
        &self.settings
    }

    /// Directory to search for `path`'s file, if the landmark occurs in it
    ///
    /// Only the directory part of `path` is considered; the root keeps every
    /// component before the landmark, the landmark itself and up to `depth`
    /// components after it.
    pub fn candidate_root(&self, path: &Path) -> Option<PathBuf> {
        let dir = path.parent()?;
        let components: Vec<Component<'_>> = dir.components().collect();
        let landmark = components.iter().position(|c| match c {
            Component::Normal(name) => name.to_str() == Some(self.settings.landmark.as_str()),
            _ => false,
        })?;
        let end = (landmark + 1 + self.settings.depth).min(components.len());
        Some(components[..end].iter().collect())
    }

    /// Rewrite every unresolvable image path that can be found again
    pub fn repair_all(&self, scene: &mut dyn SceneRepository) -> RepairReport {
        let mut report = RepairReport::default();

        for id in scene.images() {
            let Some(image) = scene.image(id) else {
                continue;
            };
            if image.filepath.as_os_str().is_empty() {
                debug!(image = %image.name, "Image has no backing path");
                continue;
            }
            if image.path_resolves() {
                continue;
            }
            report.checked += 1;

            let name = image.name.clone();
            let old = image.filepath.clone();
            match self.locate(id, &name, &old) {
                Ok(new) => match scene.set_image_path(id, new.clone()) {
                    Ok(()) => {
                        info!(image = %name, path = %new.display(), "Updated image path");
                        report.repaired.push(RepairedPath { image: id, name, old, new });
                    }
                    Err(e) => {
                        warn!(image = %name, error = %e, "Could not update image path");
                        report.misses.push(RepairMiss::Rejected {
                            image: id,
                            message: e.to_string(),
                        });
                    }
                },
                Err(miss) => report.misses.push(miss),
            }
        }

        info!(
            repaired = report.repaired_count(),
            missed = report.miss_count(),
            "Updated {} image paths",
            report.repaired_count()
        );
        report
    }

    fn locate(&self, id: ImageId, name: &str, path: &Path) -> Result<PathBuf, RepairMiss> {
        let Some(file_name) = path.file_name() else {
            info!(image = %name, "Could not determine file name");
            return Err(RepairMiss::NoFileName { image: id, path: path.to_path_buf() });
        };

        let Some(root) = self.candidate_root(path) else {
            info!(image = %name, landmark = %self.settings.landmark, "Could not determine correct path");
            return Err(RepairMiss::NoLandmark { image: id, path: path.to_path_buf() });
        };

        let mut matches = find_files(&root, file_name);
        match (matches.len(), self.settings.on_ambiguous) {
            (0, _) => {
                info!(image = %name, root = %root.display(), "Could not find file");
                Err(RepairMiss::NoMatch { image: id, root })
            }
            (1, _) | (_, AmbiguityPolicy::FirstMatch) => Ok(matches.swap_remove(0)),
            (count, AmbiguityPolicy::RequireUnique) => {
                info!(image = %name, root = %root.display(), matches = count, "Ambiguous match, path left unchanged");
                Err(RepairMiss::Ambiguous { image: id, root, matches: count })
            }
        }
    }
}

/// Every file named `file_name` under `root`
///
/// Files of a directory come before its sub-directories, and entries are
/// visited in sorted order, so the first element is the shallowest match.
/// Unreadable directories are skipped and symlinked directories are not
/// followed.
pub fn find_files(root: &Path, file_name: &OsStr) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(root, file_name, &mut found);
    found
}

fn walk(dir: &Path, file_name: &OsStr, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    // Symlinked directories are not descended into
    let mut entries: Vec<(PathBuf, bool)> = entries
        .flatten()
        .map(|entry| {
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            (entry.path(), is_dir)
        })
        .collect();
    entries.sort();

    let (dirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|(_, is_dir)| *is_dir);
    let files = files.into_iter().map(|(path, _)| path);
    let dirs = dirs.into_iter().map(|(path, _)| path);
    found.extend(files.filter(|p| p.file_name() == Some(file_name)));
    for sub in dirs {
        walk(&sub, file_name, found);
    }
}

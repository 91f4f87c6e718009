//! Export configuration
//!
//! An [`ExportConfiguration`] is an immutable snapshot of the user's choices
//! for one export run. It is validated once, before any file is touched.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ResultExt};

/// Smallest accepted uniform scale factor
pub const MIN_SCALE_FACTOR: f32 = 0.01;
/// Largest accepted uniform scale factor
pub const MAX_SCALE_FACTOR: f32 = 100.0;
/// Directory (under the output root) that receives normalized textures
pub const TEXTURE_DIR_NAME: &str = "texture";
/// Extension of the mesh files written per LOD
pub const MODEL_EXTENSION: &str = "gltf";

/// Number of additional LOD levels generated after LOD0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LodLevels {
    /// Export LOD0 only
    None,
    /// LOD0 and LOD1
    #[default]
    One,
    /// LOD0 through LOD2
    Two,
    /// LOD0 through LOD3
    Three,
}

impl LodLevels {
    /// Highest LOD index that will be exported
    pub fn count(self) -> u8 {
        match self {
            LodLevels::None => 0,
            LodLevels::One => 1,
            LodLevels::Two => 2,
            LodLevels::Three => 3,
        }
    }

    /// Every LOD index from 0 through [`count`](Self::count) inclusive
    pub fn indices(self) -> RangeInclusive<u8> {
        0..=self.count()
    }
}

impl TryFrom<u8> for LodLevels {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LodLevels::None),
            1 => Ok(LodLevels::One),
            2 => Ok(LodLevels::Two),
            3 => Ok(LodLevels::Three),
            other => Err(Error::invalid_config(format!(
                "LOD levels must be between 0 and 3, got {other}"
            ))),
        }
    }
}

impl From<LodLevels> for u8 {
    fn from(value: LodLevels) -> Self {
        value.count()
    }
}

/// Square resolution every exported texture is normalized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TextureResolution {
    /// 1024x1024
    R1024,
    /// 2048x2048
    #[default]
    R2048,
    /// 4096x4096
    R4096,
}

impl TextureResolution {
    /// Edge length in pixels
    pub fn pixels(self) -> u32 {
        match self {
            TextureResolution::R1024 => 1024,
            TextureResolution::R2048 => 2048,
            TextureResolution::R4096 => 4096,
        }
    }
}

impl TryFrom<u32> for TextureResolution {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1024 => Ok(TextureResolution::R1024),
            2048 => Ok(TextureResolution::R2048),
            4096 => Ok(TextureResolution::R4096),
            other => Err(Error::invalid_config(format!(
                "texture resolution must be 1024, 2048 or 4096, got {other}"
            ))),
        }
    }
}

impl From<TextureResolution> for u32 {
    fn from(value: TextureResolution) -> Self {
        value.pixels()
    }
}

impl std::fmt::Display for TextureResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let px = self.pixels();
        write!(f, "{px}x{px}")
    }
}

/// What path repair does when several files match under the candidate root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Take the first match in sorted depth-first order
    #[default]
    FirstMatch,
    /// Leave the path untouched and record a miss
    RequireUnique,
}

/// Strategy for guessing corrected texture paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRepairSettings {
    /// Directory name used as anchor inside stale paths
    pub landmark: String,
    /// Number of path components kept after the landmark
    pub depth: usize,
    /// Behaviour when more than one file matches
    pub on_ambiguous: AmbiguityPolicy,
}

impl Default for PathRepairSettings {
    fn default() -> Self {
        Self {
            landmark: "Downloads".to_string(),
            depth: 2,
            on_ambiguous: AmbiguityPolicy::FirstMatch,
        }
    }
}

/// User choices for one export run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfiguration {
    /// Root of the output package (the simulator's ModelLib folder)
    pub output_root: PathBuf,
    /// Name of the scene collection to export
    pub collection: String,
    /// LOD levels generated after LOD0
    pub lod_levels: LodLevels,
    /// Texture normalization target
    pub texture_resolution: TextureResolution,
    /// Write the XML manifest
    pub generate_manifest: bool,
    /// Uniform scale applied to exported geometry
    pub scale_factor: f32,
    /// Path repair strategy
    pub path_repair: PathRepairSettings,
}

impl Default for ExportConfiguration {
    fn default() -> Self {
        Self {
            output_root: PathBuf::new(),
            collection: String::new(),
            lod_levels: LodLevels::default(),
            texture_resolution: TextureResolution::default(),
            generate_manifest: true,
            scale_factor: 1.0,
            path_repair: PathRepairSettings::default(),
        }
    }
}

impl ExportConfiguration {
    /// Configuration with defaults for everything but the output root and collection
    pub fn new(output_root: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Set the LOD level count
    pub fn with_lod_levels(mut self, lod_levels: LodLevels) -> Self {
        self.lod_levels = lod_levels;
        self
    }

    /// Set the texture resolution
    pub fn with_texture_resolution(mut self, resolution: TextureResolution) -> Self {
        self.texture_resolution = resolution;
        self
    }

    /// Enable or disable manifest generation
    pub fn with_manifest(mut self, generate: bool) -> Self {
        self.generate_manifest = generate;
        self
    }

    /// Set the uniform scale factor
    pub fn with_scale_factor(mut self, scale: f32) -> Self {
        self.scale_factor = scale;
        self
    }

    /// Set the path repair strategy
    pub fn with_path_repair(mut self, settings: PathRepairSettings) -> Self {
        self.path_repair = settings;
        self
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(Error::from)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Check every invariant that must hold before an export starts
    pub fn validate(&self) -> Result<()> {
        if self.output_root.as_os_str().is_empty() {
            return Err(Error::missing_config("output_root"));
        }
        if self.collection.trim().is_empty() {
            return Err(Error::missing_config("collection"));
        }
        if !self.scale_factor.is_finite()
            || !(MIN_SCALE_FACTOR..=MAX_SCALE_FACTOR).contains(&self.scale_factor)
        {
            return Err(Error::invalid_config(format!(
                "scale factor {} outside [{MIN_SCALE_FACTOR}, {MAX_SCALE_FACTOR}]",
                self.scale_factor
            )));
        }
        if self.path_repair.landmark.is_empty() {
            return Err(Error::missing_config("path_repair.landmark"));
        }
        Ok(())
    }

    /// `<root>/<collection>`
    pub fn collection_dir(&self) -> PathBuf {
        self.output_root.join(&self.collection)
    }

    /// `<root>/texture`
    pub fn texture_dir(&self) -> PathBuf {
        self.output_root.join(TEXTURE_DIR_NAME)
    }

    /// `<root>/<collection>/<collection>_LOD<index>.gltf`
    pub fn lod_path(&self, index: u8) -> PathBuf {
        self.collection_dir()
            .join(format!("{}_LOD{index}.{MODEL_EXTENSION}", self.collection))
    }

    /// Base path the manifest name is derived from: `<root>/<collection>/<collection>.gltf`
    pub fn asset_base_path(&self) -> PathBuf {
        self.collection_dir()
            .join(format!("{}.{MODEL_EXTENSION}", self.collection))
    }
}

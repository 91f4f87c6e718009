//! MSFS Export Pipeline
//!
//! Turns one collection of a scene into a simulator-ready asset package:
//! - glTF 2.0 model files, one per LOD
//! - an XML manifest listing the LOD chain
//! - square PNG textures at a fixed resolution
//!
//! [`ExportPipeline`] runs the whole sequence; the stages are usable on
//! their own as well.

pub mod decimate;
pub mod gltf;
pub mod logging;
pub mod manifest;
pub mod mesh;
pub mod pipeline;
pub mod repair;
pub mod textures;

pub use decimate::{Decimator, NoopDecimator};
pub use gltf::GltfExporter;
pub use manifest::{generate_manifest, LodDescriptor, Manifest, ManifestError};
pub use mesh::{MeshExportError, MeshExportOptions, MeshExportReport, MeshExporter};
pub use pipeline::{cleanup_texture_dir, ExportPipeline, ExportStage, ExportSummary};
pub use repair::{PathRepairer, RepairMiss, RepairReport, RepairedPath};
pub use textures::{
    NormalizationReport, SkipReason, TextureError, TextureNormalizer, TextureOutcome,
    TextureProcessingResult,
};

//! LOD reduction hook
//!
//! The pipeline calls [`Decimator::reduce`] after each LOD is written, so
//! the next LOD is exported from the reduced geometry. Implementations read
//! meshes through [`SceneRepository::object`] and write them back with
//! [`SceneRepository::set_object_mesh`].

use msfs_core::{ObjectId, Result};
use msfs_scene::SceneRepository;

/// Reduces mesh complexity between LOD exports
pub trait Decimator {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Reduce `objects` after LOD `lod` has been exported
    fn reduce(&mut self, scene: &mut dyn SceneRepository, objects: &[ObjectId], lod: u8) -> Result<()>;
}

/// Leaves geometry untouched; every LOD file carries the same mesh
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDecimator;

impl Decimator for NoopDecimator {
    fn name(&self) -> &str {
        "noop"
    }

    fn reduce(&mut self, _scene: &mut dyn SceneRepository, _objects: &[ObjectId], _lod: u8) -> Result<()> {
        Ok(())
    }
}

//! MSFS Exporter Core Library
//!
//! This crate provides the export configuration, common types and error
//! handling shared across all exporter components.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AmbiguityPolicy, ExportConfiguration, LodLevels, PathRepairSettings, TextureResolution,
};
pub use error::{Error, Result, ResultExt};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::types::*;
}

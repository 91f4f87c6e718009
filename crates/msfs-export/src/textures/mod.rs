//! Texture normalization
//!
//! Every image used by the scene's materials is resized to the configured
//! square resolution and written as PNG into the shared texture directory.

mod encoder;
mod normalizer;
mod resampler;

pub use encoder::write_png;
pub use normalizer::{
    NormalizationReport, SkipReason, TextureNormalizer, TextureOutcome, TextureProcessingResult,
};
pub use resampler::{resample_nearest, source_indices};

use std::path::PathBuf;

use msfs_scene::SceneError;
use thiserror::Error;

/// Per-texture errors; never fatal to an export run
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Image file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Resize failed: {0}")]
    ResizeFailed(String),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u8),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Keep alphanumerics, space, `.` and `_`, then trim trailing whitespace
pub fn sanitize_file_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect();
    kept.trim_end().to_string()
}

/// File name a normalized texture is written under
///
/// Names that already end in `.png` are not suffixed twice; names that
/// sanitize to nothing fall back to `texture.png`.
pub fn texture_file_name(image_name: &str) -> String {
    let stem = sanitize_file_name(image_name);
    if stem.is_empty() {
        return "texture.png".to_string();
    }
    if stem.to_ascii_lowercase().ends_with(".png") {
        stem
    } else {
        format!("{stem}.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Wing/Diffuse: v2.jpg  "), "WingDiffuse v2.jpg");
        assert_eq!(sanitize_file_name("metal_rough.001"), "metal_rough.001");
        assert_eq!(sanitize_file_name("  lead"), "  lead");
        assert_eq!(sanitize_file_name("<>|*"), "");
    }

    #[test]
    fn test_texture_file_name() {
        assert_eq!(texture_file_name("skin"), "skin.png");
        assert_eq!(texture_file_name("skin.PNG"), "skin.PNG");
        assert_eq!(texture_file_name("skin.jpg"), "skin.jpg.png");
        assert_eq!(texture_file_name("???"), "texture.png");
    }
}

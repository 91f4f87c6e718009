//! PNG encoding of normalized pixel buffers

use std::path::Path;

use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use msfs_scene::PixelBuffer;

use crate::textures::{TextureError, TextureResult};

/// Quantize a normalized channel value to 8 bits
fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Write `buffer` to `output_path` as an 8-bit PNG
///
/// 1, 2, 3 and 4 channel buffers map to L, LA, RGB and RGBA.
pub fn write_png(buffer: &PixelBuffer, output_path: impl AsRef<Path>) -> TextureResult<()> {
    let (width, height) = (buffer.width(), buffer.height());
    let bytes: Vec<u8> = buffer.data().iter().copied().map(to_u8).collect();
    let mismatch = || TextureError::InvalidImage(format!("pixel data does not fit {width}x{height}"));

    let img = match buffer.channels() {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, bytes).ok_or_else(mismatch)?),
        2 => DynamicImage::ImageLumaA8(GrayAlphaImage::from_raw(width, height, bytes).ok_or_else(mismatch)?),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, bytes).ok_or_else(mismatch)?),
        4 => DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, bytes).ok_or_else(mismatch)?),
        other => return Err(TextureError::UnsupportedChannels(other)),
    };

    img.save_with_format(output_path.as_ref(), ImageFormat::Png)?;
    Ok(())
}

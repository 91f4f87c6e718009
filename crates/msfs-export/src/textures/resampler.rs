//! Nearest-neighbour resampling
//!
//! Each axis is mapped independently: output index `i` reads source index
//! `floor(i * (src - 1) / (size - 1))`. No filtering, so every output pixel
//! is a verbatim copy of a source pixel.

use msfs_scene::PixelBuffer;

use crate::textures::{TextureError, TextureResult};

/// Source index for every output index along one axis
pub fn source_indices(src_dim: u32, size: u32) -> Vec<u32> {
    if size <= 1 {
        return vec![0; size as usize];
    }
    let max = u64::from(src_dim.saturating_sub(1));
    let denom = u64::from(size - 1);
    (0..u64::from(size))
        .map(|i| ((i * max) / denom).min(max) as u32)
        .collect()
}

/// Resample `src` to a `size` x `size` buffer with the same channel count
pub fn resample_nearest(src: &PixelBuffer, size: u32) -> TextureResult<PixelBuffer> {
    if src.width() == 0 || src.height() == 0 {
        return Err(TextureError::InvalidDimensions {
            width: src.width(),
            height: src.height(),
        });
    }
    if src.is_empty() {
        return Err(TextureError::InvalidImage("empty pixel buffer".to_string()));
    }
    if size == 0 {
        return Err(TextureError::ResizeFailed("target size must be non-zero".to_string()));
    }

    let rows = source_indices(src.height(), size);
    let cols = source_indices(src.width(), size);

    let channels = src.channels();
    let mut data = Vec::with_capacity(size as usize * size as usize * channels as usize);
    for &row in &rows {
        for &col in &cols {
            data.extend_from_slice(src.pixel(row, col));
        }
    }

    PixelBuffer::new(size, size, channels, data)
        .map_err(|e| TextureError::ResizeFailed(e.to_string()))
}

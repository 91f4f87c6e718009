//! Raw pixel storage
//!
//! Pixels are stored row-major as `(height, width, channels)` with channel
//! values normalized to `0.0..=1.0`.

use std::path::Path;

use image::DynamicImage;

use crate::{SceneError, SceneResult};

/// Normalized floating-point pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<f32>,
}

impl PixelBuffer {
    /// Wrap raw data, checking that its length matches the declared shape
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<f32>) -> SceneResult<Self> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(SceneError::PixelDataMismatch {
                width,
                height,
                channels,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Buffer where every pixel equals `pixel`
    pub fn filled(width: u32, height: u32, pixel: &[f32]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            data.extend_from_slice(pixel);
        }
        Self {
            width,
            height,
            channels: pixel.len() as u8,
            data,
        }
    }

    /// Decode an image file from disk
    pub fn load(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|e| SceneError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::from_dynamic_image(&img))
    }

    /// Convert a decoded image, keeping alpha when the source has it
    pub fn from_dynamic_image(img: &DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        if img.color().has_alpha() {
            Self {
                width,
                height,
                channels: 4,
                data: img.to_rgba32f().into_raw(),
            }
        } else {
            Self {
                width,
                height,
                channels: 3,
                data: img.to_rgb32f().into_raw(),
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Flat channel data
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Channels of the pixel at `(row, col)`
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the buffer.
    pub fn pixel(&self, row: u32, col: u32) -> &[f32] {
        let c = self.channels as usize;
        let start = (row as usize * self.width as usize + col as usize) * c;
        &self.data[start..start + c]
    }
}

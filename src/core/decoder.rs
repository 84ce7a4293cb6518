// src/core/decoder.rs
//
// Image decoding and normalization.
// Uses the `image` crate for format-agnostic decoding; everything past this
// module works on normalized `ImageArray`s only.

use image::imageops::FilterType;
use thiserror::Error;

/// Square input size of Xception-style classifier backbones
pub const DEFAULT_TARGET_SIZE: u32 = 299;

/// Errors raised while building an `ImageArray`
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("image has zero width or height")]
    EmptyImage,

    #[error("unsupported channel count: {0} (expected 1 for grayscale or 3 for RGB)")]
    Channels(usize),

    #[error("buffer holds {actual} values, shape {width}x{height}x{channels} needs {expected}")]
    ShapeMismatch {
        width: usize,
        height: usize,
        channels: usize,
        expected: usize,
        actual: usize,
    },

    #[error("pixel value {value} at index {index} is outside [0, 1]")]
    ValueRange { index: usize, value: f32 },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Normalized image: interleaved channel values in [0.0, 1.0], row-major
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArray {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl ImageArray {
    /// Build an array, validating shape and value range
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self, PreprocessError> {
        if width == 0 || height == 0 {
            return Err(PreprocessError::EmptyImage);
        }
        if channels != 1 && channels != 3 {
            return Err(PreprocessError::Channels(channels));
        }

        let expected = width * height * channels;
        if data.len() != expected {
            return Err(PreprocessError::ShapeMismatch {
                width,
                height,
                channels,
                expected,
                actual: data.len(),
            });
        }

        if let Some((index, &value)) = data
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0 || **v > 1.0)
        {
            return Err(PreprocessError::ValueRange { index, value });
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn grayscale(width: usize, height: usize, data: Vec<f32>) -> Result<Self, PreprocessError> {
        Self::new(width, height, 1, data)
    }

    pub fn rgb(width: usize, height: usize, data: Vec<f32>) -> Result<Self, PreprocessError> {
        Self::new(width, height, 3, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Single-channel intensity: per-pixel mean of R, G and B
    pub fn intensity(&self) -> Vec<f64> {
        if self.channels == 1 {
            return self.data.iter().map(|&v| v as f64).collect();
        }

        self.data
            .chunks_exact(self.channels)
            .map(|px| px.iter().map(|&v| v as f64).sum::<f64>() / self.channels as f64)
            .collect()
    }
}

/// Decode encoded bytes, resize to `target_size` square and normalize RGB to [0, 1]
pub fn decode_image(content: &[u8], target_size: u32) -> Result<ImageArray, PreprocessError> {
    if target_size == 0 {
        return Err(PreprocessError::EmptyImage);
    }

    let decoded = image::load_from_memory(content)?;
    let rgb = decoded
        .resize_exact(target_size, target_size, FilterType::Triangle)
        .to_rgb8();

    let (width, height) = rgb.dimensions();
    let data: Vec<f32> = rgb.into_raw().into_iter().map(|v| v as f32 / 255.0).collect();

    ImageArray::rgb(width as usize, height as usize, data)
}

//! Tensor extraction for the Hangul classifier
//!
//! Downsamples the logical bitmap to the classifier's input resolution with
//! nearest-neighbour sampling (the classifier was trained on unfiltered
//! downscaled bitmaps) and normalizes intensities to [0, 1].

use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::canvas::LogicalBitmap;

/// Resampling filter used between the display and feed resolutions
pub const RESAMPLE_FILTER: FilterType = FilterType::Nearest;

/// Normalized classifier input, row-major, top-to-bottom, left-to-right
#[derive(Debug, Clone, PartialEq)]
pub struct FeedTensor {
    dim: usize,
    data: Vec<f32>,
}

impl FeedTensor {
    /// Side length of the square input
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// NHWC tensor with batch and channel of size 1, as the model expects
    pub fn to_input_array(&self) -> Array4<f32> {
        let dim = self.dim;
        Array4::from_shape_fn((1, dim, dim, 1), |(_, y, x, _)| self.data[y * dim + x])
    }
}

#[cfg(test)]
impl FeedTensor {
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at row `y`, column `x`
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.dim + x]
    }
}

/// Produces feed tensors of a fixed resolution
#[derive(Debug, Clone, Copy)]
pub struct TensorExtractor {
    feed_dim: u32,
}

impl TensorExtractor {
    pub fn new(feed_dim: u32) -> Self {
        Self { feed_dim }
    }

    /// Resample and normalize the bitmap. Pure: identical pixels always give
    /// an identical tensor.
    pub fn extract(&self, bitmap: &LogicalBitmap) -> FeedTensor {
        extract(bitmap, self.feed_dim)
    }
}

/// Resample `bitmap` to `feed_dim` x `feed_dim` and normalize each pixel by 255
pub fn extract(bitmap: &LogicalBitmap, feed_dim: u32) -> FeedTensor {
    let source = bitmap.image();
    let data = if source.dimensions() == (feed_dim, feed_dim) {
        normalize(source.as_raw())
    } else {
        let resized = imageops::resize(source, feed_dim, feed_dim, RESAMPLE_FILTER);
        normalize(resized.as_raw())
    };

    FeedTensor {
        dim: feed_dim as usize,
        data,
    }
}

fn normalize(raw: &[u8]) -> Vec<f32> {
    raw.iter().map(|&v| v as f32 / 255.0).collect()
}

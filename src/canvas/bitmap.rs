//! Logical bitmap: the authoritative drawing surface

use image::{GrayImage, Luma};

/// Intensity of untouched pixels
pub const BACKGROUND: u8 = 0;
/// Intensity of ink
pub const FOREGROUND: u8 = 255;

/// A square single-channel pixel grid, independent of the on-screen view
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalBitmap {
    image: GrayImage,
}

impl LogicalBitmap {
    /// Create a cleared bitmap of `dim` x `dim` pixels
    pub fn new(dim: u32) -> Self {
        Self {
            image: GrayImage::from_pixel(dim, dim, Luma([BACKGROUND])),
        }
    }

    /// Wrap an existing grayscale image, resampling it to `dim` x `dim`
    /// with nearest-neighbour when the size differs
    pub fn from_image(image: GrayImage, dim: u32) -> Self {
        let image = if image.dimensions() == (dim, dim) {
            image
        } else {
            image::imageops::resize(&image, dim, dim, image::imageops::FilterType::Nearest)
        };
        Self { image }
    }

    /// Side length in pixels
    pub fn dim(&self) -> u32 {
        self.image.width()
    }

    /// Set every pixel to the background intensity
    pub fn clear(&mut self) {
        self.fill(BACKGROUND);
    }

    /// Set every pixel to the given intensity
    pub fn fill(&mut self, value: u8) {
        for pixel in self.image.pixels_mut() {
            *pixel = Luma([value]);
        }
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut GrayImage {
        &mut self.image
    }

    /// Raw row-major intensities
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }
}

#[cfg(test)]
impl LogicalBitmap {
    /// Intensity at (x, y), or None when outside the grid
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.image.width() && y < self.image.height() {
            Some(self.image.get_pixel(x, y)[0])
        } else {
            None
        }
    }

    /// True when no pixel carries ink
    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p[0] == BACKGROUND)
    }

    /// Number of pixels that are not background
    pub fn inked_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p[0] != BACKGROUND).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bitmap_is_blank() {
        let bitmap = LogicalBitmap::new(128);
        assert_eq!(bitmap.dim(), 128);
        assert!(bitmap.is_blank());
        assert_eq!(bitmap.as_raw().len(), 128 * 128);
    }

    #[test]
    fn test_fill_and_clear() {
        let mut bitmap = LogicalBitmap::new(8);
        bitmap.fill(FOREGROUND);
        assert_eq!(bitmap.inked_pixels(), 64);
        assert_eq!(bitmap.get(7, 7), Some(FOREGROUND));

        bitmap.clear();
        assert!(bitmap.is_blank());
    }

    #[test]
    fn test_get_out_of_bounds() {
        let bitmap = LogicalBitmap::new(4);
        assert_eq!(bitmap.get(4, 0), None);
        assert_eq!(bitmap.get(0, 4), None);
    }

    #[test]
    fn test_from_image_resamples_to_dim() {
        let image = GrayImage::from_pixel(32, 32, Luma([FOREGROUND]));
        let bitmap = LogicalBitmap::from_image(image, 128);
        assert_eq!(bitmap.dim(), 128);
        assert_eq!(bitmap.inked_pixels(), 128 * 128);
    }
}

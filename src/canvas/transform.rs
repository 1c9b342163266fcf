//! View-space to bitmap-space coordinate mapping
//!
//! The logical bitmap is scaled uniformly to fit the view (never cropped) and
//! centered. Pointer positions are mapped back through the exact inverse of
//! that scale + translate.

use tracing::debug;

use crate::error::ScribeError;

/// Uniform scale followed by a translation, bitmap space -> view space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// View pixels per bitmap pixel
    pub scale: f32,
    /// Horizontal offset of the scaled bitmap inside the view
    pub offset_x: f32,
    /// Vertical offset of the scaled bitmap inside the view
    pub offset_y: f32,
}

impl ViewTransform {
    /// Map a view coordinate into bitmap space
    pub fn to_bitmap(&self, vx: f32, vy: f32) -> (f32, f32) {
        ((vx - self.offset_x) / self.scale, (vy - self.offset_y) / self.scale)
    }

    /// Area covered by the bitmap in view space as (x, y, side)
    pub fn displayed_square(&self, bitmap_dim: u32) -> (f32, f32, f32) {
        (self.offset_x, self.offset_y, bitmap_dim as f32 * self.scale)
    }
}

#[cfg(test)]
impl ViewTransform {
    /// Map a bitmap coordinate into view space
    pub fn to_view(&self, bx: f32, by: f32) -> (f32, f32) {
        (bx * self.scale + self.offset_x, by * self.scale + self.offset_y)
    }
}

/// Compute the scale-to-fit, centered transform for a square bitmap
pub fn compute_transform(
    view_width: f32,
    view_height: f32,
    bitmap_dim: u32,
) -> Result<ViewTransform, ScribeError> {
    if bitmap_dim == 0 {
        return Err(ScribeError::InvalidInput("bitmap dimension must be positive".into()));
    }
    // Also rejects NaN sizes
    if !(view_width > 0.0 && view_height > 0.0) {
        return Err(ScribeError::TransformNotReady {
            width: view_width,
            height: view_height,
        });
    }

    let dim = bitmap_dim as f32;
    let scale = (view_width / dim).min(view_height / dim);
    let scaled = dim * scale;

    Ok(ViewTransform {
        scale,
        offset_x: view_width / 2.0 - scaled / 2.0,
        offset_y: view_height / 2.0 - scaled / 2.0,
    })
}

/// Caches the transform for the current view size
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    bitmap_dim: u32,
    view_size: (f32, f32),
    transform: Option<ViewTransform>,
}

impl CoordinateMapper {
    pub fn new(bitmap_dim: u32) -> Self {
        Self {
            bitmap_dim,
            view_size: (0.0, 0.0),
            transform: None,
        }
    }

    /// Report the view's displayed size. Returns true when the transform was
    /// recomputed; an unmeasured view leaves the mapper not ready.
    pub fn set_view_size(&mut self, width: f32, height: f32) -> bool {
        if self.view_size == (width, height) && self.transform.is_some() {
            return false;
        }
        self.view_size = (width, height);

        match compute_transform(width, height, self.bitmap_dim) {
            Ok(transform) => {
                debug!(
                    "View resized to {}x{}: scale {:.3}, offset ({:.1}, {:.1})",
                    width, height, transform.scale, transform.offset_x, transform.offset_y
                );
                self.transform = Some(transform);
                true
            }
            Err(e) => {
                debug!("Deferring transform: {}", e);
                self.transform = None;
                false
            }
        }
    }

    /// Current transform, if the view has been measured
    pub fn transform(&self) -> Result<ViewTransform, ScribeError> {
        self.transform.ok_or(ScribeError::TransformNotReady {
            width: self.view_size.0,
            height: self.view_size.1,
        })
    }

    /// Map a pointer position into bitmap space
    pub fn to_bitmap(&self, vx: f32, vy: f32) -> Result<(f32, f32), ScribeError> {
        Ok(self.transform()?.to_bitmap(vx, vy))
    }
}

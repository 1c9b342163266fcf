//! Drawing Layer
//!
//! Turns pointer input into ink on a fixed-size logical bitmap. The bitmap
//! resolution is independent of the on-screen view; the coordinate mapper
//! bridges the two.

pub mod bitmap;
pub mod buffer;
pub mod transform;

pub use bitmap::LogicalBitmap;
pub use buffer::{BitmapPoint, StrokeCanvas};
pub use transform::CoordinateMapper;

/// Pointer input in view space, processed strictly in arrival order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
}

//! Stroke canvas buffer
//!
//! Owns the logical bitmap plus the vector strokes drawn into it. Ink is
//! rasterized immediately, one segment per pointer event, so the bitmap always
//! reflects everything drawn so far. The vector strokes are only kept to
//! re-render the bitmap when it is recreated after a detach.

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;
use tracing::debug;

use super::bitmap::{LogicalBitmap, FOREGROUND};

/// A point in logical bitmap space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitmapPoint {
    pub x: f32,
    pub y: f32,
}

impl From<(f32, f32)> for BitmapPoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Points of one pointer-down to pointer-up gesture, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stroke {
    points: Vec<BitmapPoint>,
}

impl Stroke {
    fn starting_at(point: BitmapPoint) -> Self {
        Self { points: vec![point] }
    }

    pub fn points(&self) -> &[BitmapPoint] {
        &self.points
    }
}

/// Drawing surface with incremental rasterization
#[derive(Debug, Clone)]
pub struct StrokeCanvas {
    dim: u32,
    stroke_width: f32,
    bitmap: Option<LogicalBitmap>,
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
}

impl StrokeCanvas {
    /// Create a detached canvas; call [`Self::attach`] before drawing
    pub fn new(dim: u32, stroke_width: f32) -> Self {
        Self {
            dim,
            stroke_width,
            bitmap: None,
            strokes: Vec::new(),
            active: None,
        }
    }

    /// Create a canvas with its bitmap already allocated
    pub fn attached(dim: u32, stroke_width: f32) -> Self {
        let mut canvas = Self::new(dim, stroke_width);
        canvas.attach();
        canvas
    }

    /// Allocate the bitmap (view resumed) and re-render committed strokes
    pub fn attach(&mut self) {
        let mut bitmap = LogicalBitmap::new(self.dim);
        for stroke in &self.strokes {
            rasterize_stroke(bitmap.image_mut(), stroke, self.stroke_width);
        }
        debug!("Canvas attached ({} committed strokes)", self.strokes.len());
        self.bitmap = Some(bitmap);
    }

    /// Release the bitmap (view paused). Committed strokes are kept.
    pub fn detach(&mut self) {
        self.commit_active();
        self.bitmap = None;
        debug!("Canvas detached");
    }

    /// Start a new stroke, committing any stroke still in progress
    pub fn begin_stroke(&mut self, point: BitmapPoint) {
        self.commit_active();

        let Some(bitmap) = self.bitmap.as_mut() else {
            debug!("Ignoring stroke start while detached");
            return;
        };

        // A tap with no movement still leaves a round dot
        rasterize_segment(bitmap.image_mut(), point, point, self.stroke_width);
        self.active = Some(Stroke::starting_at(point));
    }

    /// Append a point to the active stroke and rasterize the new segment
    pub fn extend_stroke(&mut self, point: BitmapPoint) {
        let last = match self.active.as_ref().and_then(|s| s.points.last()) {
            Some(&last) => last,
            None => {
                // Move without a preceding down: treat as a new stroke
                self.begin_stroke(point);
                return;
            }
        };

        let Some(bitmap) = self.bitmap.as_mut() else {
            return;
        };
        rasterize_segment(bitmap.image_mut(), last, point, self.stroke_width);

        if let Some(active) = self.active.as_mut() {
            active.points.push(point);
        }
    }

    /// Finish the active stroke (pointer up)
    pub fn end_stroke(&mut self) {
        self.commit_active();
    }

    /// Clear the bitmap to background and discard all stroke data
    pub fn reset(&mut self) {
        self.strokes.clear();
        self.active = None;
        if let Some(bitmap) = self.bitmap.as_mut() {
            bitmap.clear();
        }
    }

    /// Current bitmap, if attached
    pub fn bitmap(&self) -> Option<&LogicalBitmap> {
        self.bitmap.as_ref()
    }

    fn commit_active(&mut self) {
        if let Some(stroke) = self.active.take() {
            self.strokes.push(stroke);
        }
    }
}

#[cfg(test)]
impl BitmapPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
impl Stroke {
    pub fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
impl StrokeCanvas {
    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn is_attached(&self) -> bool {
        self.bitmap.is_some()
    }

    /// Committed strokes, oldest first
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.active.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.active.is_none()
    }
}

/// Draw every segment of a stroke into `image`
pub fn rasterize_stroke(image: &mut GrayImage, stroke: &Stroke, width: f32) {
    match stroke.points() {
        [] => {}
        [only] => rasterize_segment(image, *only, *only, width),
        points => {
            for pair in points.windows(2) {
                rasterize_segment(image, pair[0], pair[1], width);
            }
        }
    }
}

/// Draw one thick segment with round caps. Consecutive segments share an
/// endpoint cap, which yields round joins.
pub fn rasterize_segment(image: &mut GrayImage, from: BitmapPoint, to: BitmapPoint, width: f32) {
    let ink = Luma([FOREGROUND]);
    let half = (width / 2.0).max(0.0);
    let radius = half.round() as i32;
    let limit = (image.width().max(image.height()) as f32) * 4.0;

    let a = (to_pixel(from.x, limit), to_pixel(from.y, limit));
    let b = (to_pixel(to.x, limit), to_pixel(to.y, limit));

    draw_filled_circle_mut(image, a, radius, ink);
    if a != b {
        draw_filled_circle_mut(image, b, radius, ink);
    }

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if !(len > f32::EPSILON) {
        return;
    }

    // Rectangle around the segment, offset by half the width on each side
    let nx = -dy / len * half;
    let ny = dx / len * half;
    let corner = |x: f32, y: f32| Point::new(to_pixel(x, limit), to_pixel(y, limit));
    let body = [
        corner(from.x + nx, from.y + ny),
        corner(to.x + nx, to.y + ny),
        corner(to.x - nx, to.y - ny),
        corner(from.x - nx, from.y - ny),
    ];

    // draw_polygon_mut rejects a closed outline
    if body[0] != body[3] {
        draw_polygon_mut(image, &body, ink);
    }
}

fn to_pixel(v: f32, limit: f32) -> i32 {
    v.clamp(-limit, limit).floor() as i32
}

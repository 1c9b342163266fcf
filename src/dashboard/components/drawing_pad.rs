//! Drawing pad widget
//!
//! Shows the logical bitmap scaled to fit the allocated area and turns drag
//! and tap input into pointer events in view coordinates (relative to the
//! pad's top-left corner).

use egui::{pos2, Color32, ColorImage, Pos2, Rect, Rounding, Sense, Stroke, TextureHandle, TextureOptions, Vec2};

use crate::app::HangulApp;
use crate::canvas::{LogicalBitmap, PointerEvent};
use crate::dashboard::theme::ThemeColors;

/// Texture cache for the drawing surface
#[derive(Default)]
pub struct DrawingPad {
    texture: Option<TextureHandle>,
    stale: bool,
}

impl DrawingPad {
    /// Force a texture upload on the next frame
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Lay out the pad, feed its input to `app` and paint the bitmap
    pub fn show(&mut self, ui: &mut egui::Ui, app: &mut HangulApp, height: f32) {
        let size = Vec2::new(ui.available_width(), height);
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let rect = response.rect;

        app.on_view_resized(rect.width(), rect.height());

        for event in pointer_events(ui, &response) {
            let event = to_view_space(event, rect.min);
            if app.handle_pointer(event) {
                self.stale = true;
            }
        }

        painter.rect_filled(rect, Rounding::same(6.0), ThemeColors::PAD_MARGIN);

        let Some(bitmap) = app.canvas().bitmap() else {
            return;
        };
        let Ok(transform) = app.mapper().transform() else {
            return;
        };

        if self.stale || self.texture.is_none() {
            let image = to_color_image(bitmap);
            match self.texture.as_mut() {
                Some(texture) => texture.set(image, TextureOptions::NEAREST),
                None => {
                    self.texture = Some(ui.ctx().load_texture("drawing-pad", image, TextureOptions::NEAREST));
                }
            }
            self.stale = false;
        }

        let (x, y, side) = transform.displayed_square(bitmap.dim());
        let square = Rect::from_min_size(rect.min + Vec2::new(x, y), Vec2::splat(side));
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                square,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        painter.rect_stroke(square, Rounding::ZERO, Stroke::new(1.0, ThemeColors::BORDER));
    }
}

/// Events in screen coordinates, in the order they happened this frame
fn pointer_events(ui: &egui::Ui, response: &egui::Response) -> Vec<PointerEvent> {
    let mut events = Vec::new();
    let current = response.interact_pointer_pos();

    if response.drag_started() {
        // The drag is detected after the pointer has already moved a little
        let origin = ui.input(|i| i.pointer.press_origin()).or(current);
        if let Some(origin) = origin {
            events.push(PointerEvent::Down { x: origin.x, y: origin.y });
        }
    }
    if response.dragged() && response.drag_delta() != Vec2::ZERO {
        if let Some(pos) = current {
            events.push(PointerEvent::Move { x: pos.x, y: pos.y });
        }
    }
    if response.drag_stopped() {
        events.push(PointerEvent::Up);
    }
    if response.clicked() {
        if let Some(pos) = current {
            events.push(PointerEvent::Down { x: pos.x, y: pos.y });
            events.push(PointerEvent::Up);
        }
    }

    events
}

fn to_view_space(event: PointerEvent, origin: Pos2) -> PointerEvent {
    match event {
        PointerEvent::Down { x, y } => PointerEvent::Down { x: x - origin.x, y: y - origin.y },
        PointerEvent::Move { x, y } => PointerEvent::Move { x: x - origin.x, y: y - origin.y },
        PointerEvent::Up => PointerEvent::Up,
    }
}

fn to_color_image(bitmap: &LogicalBitmap) -> ColorImage {
    let dim = bitmap.dim() as usize;
    ColorImage::from_gray([dim, dim], bitmap.as_raw())
}

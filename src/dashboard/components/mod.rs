//! Reusable widgets for the recognition window

pub mod drawing_pad;
pub mod status_card;

pub use drawing_pad::DrawingPad;
pub use status_card::StatusCard;

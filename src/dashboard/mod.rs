//! Recognition window
//!
//! An egui front end over the coordinator: drawing pad, command buttons,
//! alternates, recognized text and translation.

pub mod app;
pub mod components;
pub mod theme;

pub use app::{run_dashboard, DashboardApp};

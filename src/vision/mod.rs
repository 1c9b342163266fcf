//! Recognition layer
//!
//! Turns the logical bitmap into a classifier tensor, runs the ONNX
//! classifier on a background thread and ranks its scores against the
//! label vocabulary.

pub mod labels;
pub mod models;
pub mod preprocess;
pub mod ranking;
pub mod worker;

pub use models::{load_model, LoadedModel};
pub use preprocess::{FeedTensor, TensorExtractor};
pub use ranking::rank_predictions;
pub use worker::ClassifierWorker;

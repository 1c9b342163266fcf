//! Error taxonomy for the recognition pipeline

use thiserror::Error;

/// Errors surfaced by the drawing, recognition and translation layers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScribeError {
    /// Model, vocabulary or settings are missing, unreadable or inconsistent.
    /// Fatal for the classify path.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A caller violated a precondition (size mismatch, out-of-range N)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The view has not been measured yet, so no transform exists
    #[error("view transform not ready (view is {width}x{height})")]
    TransformNotReady { width: f32, height: f32 },

    /// The classifier failed on a single request
    #[error("inference failed: {0}")]
    Inference(String),

    /// Remote translation failed (network, auth, quota)
    #[error("translation failed: {0}")]
    Translation(String),
}

impl ScribeError {
    /// Whether this error should stop the classify path for good
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScribeError::Configuration(_))
    }
}

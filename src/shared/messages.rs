//! Message types between the UI thread and background workers

use crate::error::ScribeError;
use crate::vision::FeedTensor;

/// User commands issued from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reset the canvas, recognized text, translation and alternates
    Clear,
    /// Recognize the current drawing
    Classify,
    /// Remove the last recognized character
    Backspace,
    /// Append a space to the recognized text
    Space,
    /// Translate the recognized text
    Submit,
    /// Replace the last character with the ranked label at this index
    PickAlternate(usize),
}

/// Requests sent to the classifier worker
#[derive(Debug)]
pub enum WorkerRequest {
    /// Run inference on a snapshot of the canvas
    Classify { generation: u64, tensor: FeedTensor },
    /// Stop the worker thread
    Shutdown,
}

/// Results delivered back to the UI thread
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A classify request finished
    Classified {
        generation: u64,
        outcome: Result<Vec<String>, ScribeError>,
    },
    /// A translation request finished
    Translated {
        generation: u64,
        outcome: Result<String, ScribeError>,
    },
}

//! Shared state and messaging between the UI and background workers

pub mod messages;
pub mod state;

pub use messages::{Command, WorkerEvent, WorkerRequest};
pub use state::{ClassifierStatus, Effect, SessionState, SharedStatus};

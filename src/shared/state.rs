//! Session state and classifier readiness
//!
//! Commands are applied to [`SessionState`] by plain handler functions. Work
//! that has to leave the UI thread (inference, translation) comes back as an
//! [`Effect`] for the coordinator to carry out, tagged with a generation id so
//! that late results can be recognized as stale.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ScribeError;
use crate::shared::messages::Command;

/// Readiness of the background-loaded classifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClassifierStatus {
    /// Loading has not started
    #[default]
    Unloaded,
    /// Model and vocabulary are being read
    Loading,
    /// Classifier can accept requests
    Ready,
    /// Loading or a later request failed fatally
    Failed(String),
}

/// Classifier status shared between the loader thread and the UI
pub type SharedStatus = Arc<RwLock<ClassifierStatus>>;

impl ClassifierStatus {
    /// Unloaded/Failed -> Loading. Returns false if already loading or ready.
    pub fn begin_loading(&mut self) -> bool {
        match self {
            ClassifierStatus::Unloaded | ClassifierStatus::Failed(_) => {
                *self = ClassifierStatus::Loading;
                true
            }
            _ => false,
        }
    }

    /// Loading -> Ready
    pub fn mark_ready(&mut self) -> bool {
        if *self == ClassifierStatus::Loading {
            *self = ClassifierStatus::Ready;
            true
        } else {
            warn!("Ignoring ready signal while {:?}", self);
            false
        }
    }

    /// Any state -> Failed
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        *self = ClassifierStatus::Failed(reason.into());
    }

    pub fn is_ready(&self) -> bool {
        *self == ClassifierStatus::Ready
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            ClassifierStatus::Unloaded => "Not loaded",
            ClassifierStatus::Loading => "Loading",
            ClassifierStatus::Ready => "Ready",
            ClassifierStatus::Failed(_) => "Failed",
        }
    }
}

/// Work the coordinator must perform after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Snapshot the canvas and send it to the classifier
    Classify { generation: u64 },
    /// Clear the drawing
    ResetCanvas,
    /// Send text to the translation service
    Translate { generation: u64, text: String },
}

/// Text and request bookkeeping for one drawing session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Accumulated recognized text
    pub text: String,
    /// Latest translation result
    pub translation: String,
    /// Last user-visible error
    pub last_error: Option<String>,
    /// Labels of the last classification, best first
    ranked: Vec<String>,
    generation: u64,
    pending_classification: Option<u64>,
    pending_translation: Option<u64>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command, returning the effects to carry out in order
    pub fn handle(&mut self, command: Command, status: &ClassifierStatus) -> Vec<Effect> {
        match command {
            Command::Clear => self.clear(),
            Command::Classify => self.classify(status),
            Command::Backspace => self.backspace(),
            Command::Space => {
                self.text.push(' ');
                vec![]
            }
            Command::Submit => self.submit(),
            Command::PickAlternate(index) => {
                self.pick_alternate(index);
                vec![]
            }
        }
    }

    fn clear(&mut self) -> Vec<Effect> {
        self.text.clear();
        self.translation.clear();
        self.last_error = None;
        self.ranked.clear();
        self.discard_pending_classification();
        self.pending_translation = None;
        vec![Effect::ResetCanvas]
    }

    fn classify(&mut self, status: &ClassifierStatus) -> Vec<Effect> {
        if !status.is_ready() {
            warn!("Classify requested while classifier is {:?}", status);
            self.last_error = Some(format!("Classifier not ready ({})", status.label()));
            return vec![];
        }
        if let Some(previous) = self.pending_classification {
            debug!("Classify request {} superseded", previous);
        }

        let generation = self.next_generation();
        self.pending_classification = Some(generation);
        // The canvas is cleared for the next character once the snapshot is taken
        vec![Effect::Classify { generation }, Effect::ResetCanvas]
    }

    fn backspace(&mut self) -> Vec<Effect> {
        self.text.pop();
        self.ranked.clear();
        self.discard_pending_classification();
        vec![Effect::ResetCanvas]
    }

    fn submit(&mut self) -> Vec<Effect> {
        self.ranked.clear();
        if self.text.is_empty() {
            return vec![];
        }
        let generation = self.next_generation();
        self.pending_translation = Some(generation);
        vec![Effect::Translate {
            generation,
            text: self.text.clone(),
        }]
    }

    fn pick_alternate(&mut self, index: usize) {
        if index == 0 {
            return;
        }
        let Some(label) = self.ranked.get(index).cloned() else {
            warn!("No alternate at index {}", index);
            return;
        };
        self.text.pop();
        self.text.push_str(&label);
    }

    fn discard_pending_classification(&mut self) {
        if let Some(generation) = self.pending_classification.take() {
            debug!("Discarding in-flight classification {}", generation);
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Apply a finished classification. Returns false if it was stale.
    pub fn complete_classification(
        &mut self,
        generation: u64,
        outcome: Result<Vec<String>, ScribeError>,
    ) -> bool {
        if self.pending_classification != Some(generation) {
            debug!("Dropping stale classification {}", generation);
            return false;
        }
        self.pending_classification = None;

        match outcome {
            Ok(labels) => {
                if let Some(best) = labels.first() {
                    self.text.push_str(best);
                }
                self.ranked = labels;
                self.last_error = None;
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Apply a finished translation. Returns false if it was stale.
    pub fn complete_translation(
        &mut self,
        generation: u64,
        outcome: Result<String, ScribeError>,
    ) -> bool {
        if self.pending_translation != Some(generation) {
            debug!("Dropping stale translation {}", generation);
            return false;
        }
        self.pending_translation = None;

        match outcome {
            Ok(text) => self.translation = text,
            Err(e) => {
                self.translation.clear();
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Whether the classify control should be enabled
    pub fn can_classify(&self, status: &ClassifierStatus) -> bool {
        status.is_ready() && self.pending_classification.is_none()
    }

    pub fn is_classifying(&self) -> bool {
        self.pending_classification.is_some()
    }

    pub fn is_translating(&self) -> bool {
        self.pending_translation.is_some()
    }

    /// Runner-up labels offered as replacements, paired with their index
    pub fn alternates(&self) -> impl Iterator<Item = (usize, &str)> {
        self.ranked
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, label)| (i, label.as_str()))
    }
}

#[cfg(test)]
impl SessionState {
    /// Full ranked list of the last classification
    pub fn ranked(&self) -> &[String] {
        &self.ranked
    }
}

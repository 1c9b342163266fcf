//! Background classifier worker
//!
//! One thread loads the model and vocabulary, then serves classify requests
//! in arrival order. The classifier never leaves this thread, so requests
//! cannot overlap on it.

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::ScribeError;
use crate::shared::{SharedStatus, WorkerEvent, WorkerRequest};
use crate::vision::labels::LabelVocabulary;
use crate::vision::models::{Classifier, LoadedModel};
use crate::vision::preprocess::FeedTensor;
use crate::vision::ranking::rank;

/// Handle to the classifier thread
pub struct ClassifierWorker {
    requests: Sender<WorkerRequest>,
    handle: Option<JoinHandle<()>>,
}

impl ClassifierWorker {
    /// Start loading on a new thread. `status` moves to Loading immediately and
    /// to Ready or Failed when loading ends.
    pub fn spawn<L>(
        loader: L,
        top_n: usize,
        status: SharedStatus,
        events: Sender<WorkerEvent>,
    ) -> Result<Self>
    where
        L: FnOnce() -> Result<LoadedModel> + Send + 'static,
    {
        if !status.write().begin_loading() {
            anyhow::bail!("Classifier is already loading or loaded");
        }

        let (requests, inbox) = unbounded();
        let handle = std::thread::Builder::new()
            .name("classifier".to_string())
            .spawn(move || run_worker(loader, top_n, status, inbox, events))?;

        Ok(Self {
            requests,
            handle: Some(handle),
        })
    }

    /// Queue a classify request. Returns false if the worker has stopped.
    pub fn submit(&self, generation: u64, tensor: FeedTensor) -> bool {
        self.requests
            .send(WorkerRequest::Classify { generation, tensor })
            .is_ok()
    }

}

impl Drop for ClassifierWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker<L>(
    loader: L,
    top_n: usize,
    status: SharedStatus,
    inbox: Receiver<WorkerRequest>,
    events: Sender<WorkerEvent>,
) where
    L: FnOnce() -> Result<LoadedModel>,
{
    info!("Classifier worker starting...");
    let start = Instant::now();

    let LoadedModel {
        mut classifier,
        vocabulary,
    } = match loader() {
        Ok(model) => model,
        Err(e) => {
            error!("Error loading pre-trained model: {:#}", e);
            status.write().mark_failed(format!("{:#}", e));
            return;
        }
    };

    // Never ask for more labels than exist
    let n = top_n.min(vocabulary.len());
    if n < top_n {
        warn!(
            "top_n {} exceeds vocabulary size {}, returning {} labels",
            top_n,
            vocabulary.len(),
            n
        );
    }

    status.write().mark_ready();
    info!(
        "Classifier ready in {:?} ({} labels)",
        start.elapsed(),
        vocabulary.len()
    );

    while let Ok(request) = inbox.recv() {
        match request {
            WorkerRequest::Shutdown => break,
            WorkerRequest::Classify { generation, tensor } => {
                let started = Instant::now();
                let outcome = classify_tensor(classifier.as_mut(), &vocabulary, &tensor, n);
                debug!(
                    "Classification {} finished in {:?}",
                    generation,
                    started.elapsed()
                );

                if let Err(e) = &outcome {
                    if e.is_fatal() {
                        error!("Classifier disabled: {}", e);
                        status.write().mark_failed(e.to_string());
                    } else {
                        warn!("Classification {} failed: {}", generation, e);
                    }
                }

                if events
                    .send(WorkerEvent::Classified { generation, outcome })
                    .is_err()
                {
                    break;
                }
            }
        }
    }

    info!("Classifier worker exiting...");
}

/// Run inference and return the `n` best labels, most confident first
pub fn classify_tensor(
    classifier: &mut dyn Classifier,
    vocabulary: &LabelVocabulary,
    tensor: &FeedTensor,
    n: usize,
) -> Result<Vec<String>, ScribeError> {
    let scores = classifier.classify(tensor).map_err(|e| {
        match e.downcast::<ScribeError>() {
            Ok(scribe) => scribe,
            Err(other) => ScribeError::Inference(format!("{:#}", other)),
        }
    })?;

    vocabulary.check_output_width(scores.len())?;
    rank(&scores, vocabulary.labels(), n)
}

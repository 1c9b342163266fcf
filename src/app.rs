//! Application Coordinator
//!
//! Owns the drawing surface, the session state and the background workers.
//! The UI feeds it pointer events and commands; results from the classifier
//! thread and the translation runtime come back through one event channel
//! that is drained once per frame.

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::canvas::{BitmapPoint, CoordinateMapper, PointerEvent, StrokeCanvas};
use crate::config::AppConfig;
use crate::error::ScribeError;
use crate::shared::{ClassifierStatus, Command, Effect, SessionState, SharedStatus, WorkerEvent};
use crate::translate::{HttpTranslator, TranslationRequest, Translator, UnconfiguredTranslator};
use crate::vision::{load_model, ClassifierWorker, LoadedModel, TensorExtractor};

/// Main application coordinator
pub struct HangulApp {
    config: AppConfig,
    canvas: StrokeCanvas,
    mapper: CoordinateMapper,
    extractor: TensorExtractor,
    session: SessionState,
    /// Classifier readiness, written by the worker thread
    status: SharedStatus,
    worker: Option<ClassifierWorker>,
    events_tx: Sender<WorkerEvent>,
    events: Receiver<WorkerEvent>,
    runtime: Runtime,
    translator: Arc<dyn Translator>,
}

impl HangulApp {
    /// Create a coordinator using the translation service from the config
    pub fn new(config: AppConfig) -> Result<Self> {
        let translator: Arc<dyn Translator> = if config.translation.is_configured() {
            Arc::new(HttpTranslator::new(&config.translation)?)
        } else {
            info!("No translation service configured, submit will report an error");
            Arc::new(UnconfiguredTranslator)
        };
        Self::with_translator(config, translator)
    }

    /// Create a coordinator with an explicit translation backend
    pub fn with_translator(config: AppConfig, translator: Arc<dyn Translator>) -> Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("translate")
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        let (events_tx, events) = unbounded();
        let canvas = StrokeCanvas::attached(config.canvas.display_dim, config.canvas.stroke_width);

        Ok(Self {
            mapper: CoordinateMapper::new(config.canvas.display_dim),
            extractor: TensorExtractor::new(config.canvas.feed_dim),
            canvas,
            session: SessionState::new(),
            status: Arc::new(RwLock::new(ClassifierStatus::Unloaded)),
            worker: None,
            events_tx,
            events,
            runtime,
            translator,
            config,
        })
    }

    /// Load the configured model on the classifier thread
    pub fn start_classifier(&mut self) -> Result<()> {
        let config = self.config.clone();
        self.start_classifier_with(move || load_model(&config))
    }

    /// Load a classifier with a custom loader on the classifier thread
    pub fn start_classifier_with<L>(&mut self, loader: L) -> Result<()>
    where
        L: FnOnce() -> Result<LoadedModel> + Send + 'static,
    {
        if *self.status.read() == ClassifierStatus::Loading {
            anyhow::bail!("Classifier is already loading");
        }
        if let Some(previous) = self.worker.take() {
            info!("Reloading classifier");
            // Joins the thread, so nothing else writes the status after this
            drop(previous);
        }
        *self.status.write() = ClassifierStatus::Unloaded;

        let worker = ClassifierWorker::spawn(
            loader,
            self.config.ranking.top_n,
            self.status.clone(),
            self.events_tx.clone(),
        )?;
        self.worker = Some(worker);
        info!("Classifier loading in background thread");
        Ok(())
    }

    /// Apply a user command and carry out its effects in order
    pub fn dispatch(&mut self, command: Command) {
        debug!("Command {:?}", command);
        let status = self.status.read().clone();
        let effects = self.session.handle(command, &status);

        for effect in effects {
            match effect {
                Effect::Classify { generation } => self.submit_classification(generation),
                Effect::ResetCanvas => self.canvas.reset(),
                Effect::Translate { generation, text } => self.submit_translation(generation, text),
            }
        }
    }

    fn submit_classification(&mut self, generation: u64) {
        let Some(bitmap) = self.canvas.bitmap() else {
            self.session.complete_classification(
                generation,
                Err(ScribeError::InvalidInput("canvas is detached".into())),
            );
            return;
        };

        // Snapshot now; the canvas is reset right after
        let tensor = self.extractor.extract(bitmap);

        let submitted = self
            .worker
            .as_ref()
            .map(|worker| worker.submit(generation, tensor))
            .unwrap_or(false);
        if !submitted {
            warn!("Classifier worker is not running");
            self.session.complete_classification(
                generation,
                Err(ScribeError::Inference("classifier worker is not running".into())),
            );
        }
    }

    fn submit_translation(&mut self, generation: u64, text: String) {
        let request = TranslationRequest::new(text, &self.config.translation);
        let translator = self.translator.clone();
        let events = self.events_tx.clone();

        self.runtime.spawn(async move {
            let outcome = translator.translate(&request).await;
            let _ = events.send(WorkerEvent::Translated { generation, outcome });
        });
    }

    /// Apply finished background work. Returns true if anything changed.
    pub fn poll_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            changed |= match event {
                WorkerEvent::Classified { generation, outcome } => {
                    self.session.complete_classification(generation, outcome)
                }
                WorkerEvent::Translated { generation, outcome } => {
                    self.session.complete_translation(generation, outcome)
                }
            };
        }
        changed
    }

    /// Feed a pointer event in view coordinates. Returns true if ink changed.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down { x, y } => match self.mapper.to_bitmap(x, y) {
                Ok(point) => {
                    self.canvas.begin_stroke(BitmapPoint::from(point));
                    true
                }
                Err(e) => {
                    debug!("Dropping pointer down: {}", e);
                    false
                }
            },
            PointerEvent::Move { x, y } => match self.mapper.to_bitmap(x, y) {
                Ok(point) => {
                    self.canvas.extend_stroke(BitmapPoint::from(point));
                    true
                }
                Err(e) => {
                    debug!("Dropping pointer move: {}", e);
                    false
                }
            },
            PointerEvent::Up => {
                self.canvas.end_stroke();
                false
            }
        }
    }

    /// Report the drawing view's size in screen units
    pub fn on_view_resized(&mut self, width: f32, height: f32) -> bool {
        self.mapper.set_view_size(width, height)
    }

    /// View became visible
    pub fn attach(&mut self) {
        self.canvas.attach();
    }

    /// View was hidden; the bitmap is released until the next attach
    pub fn detach(&mut self) {
        self.canvas.detach();
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn canvas(&self) -> &StrokeCanvas {
        &self.canvas
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Snapshot of the classifier status
    pub fn status(&self) -> ClassifierStatus {
        self.status.read().clone()
    }

    pub fn can_classify(&self) -> bool {
        self.session.can_classify(&self.status.read())
    }

    /// Whether background work is still outstanding
    pub fn is_busy(&self) -> bool {
        self.session.is_classifying()
            || self.session.is_translating()
            || *self.status.read() == ClassifierStatus::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::labels::LabelVocabulary;
    use crate::vision::models::Classifier;
    use crate::vision::FeedTensor;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    /// Scores each label by how much ink the tensor holds, so a blank
    /// canvas and a drawn one rank differently
    struct InkClassifier;

    impl Classifier for InkClassifier {
        fn classify(&mut self, input: &FeedTensor) -> Result<Vec<f32>> {
            let ink: f32 = input.as_slice().iter().sum();
            if ink > 0.0 {
                Ok(vec![0.1, 0.9, 0.05, 0.3, 0.05])
            } else {
                Ok(vec![0.9, 0.1, 0.05, 0.3, 0.05])
            }
        }
    }

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, request: &TranslationRequest) -> Result<String, ScribeError> {
            Ok(format!("{}:{}", request.target_lang, request.text))
        }
    }

    fn loaded() -> Result<LoadedModel> {
        Ok(LoadedModel {
            classifier: Box::new(InkClassifier),
            vocabulary: LabelVocabulary::parse("가\n나\n다\n라\n마\n")?,
        })
    }

    fn wait_until(app: &mut HangulApp, done: impl Fn(&HangulApp) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            app.poll_events();
            if done(app) {
                return;
            }
            assert!(Instant::now() < deadline, "timed out waiting for background work");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn ready_app() -> HangulApp {
        let mut app = HangulApp::with_translator(AppConfig::default(), Arc::new(EchoTranslator)).unwrap();
        app.start_classifier_with(loaded).unwrap();
        wait_until(&mut app, |app| app.status().is_ready());
        app.on_view_resized(256.0, 256.0);
        app
    }

    fn draw_line(app: &mut HangulApp) {
        app.handle_pointer(PointerEvent::Down { x: 40.0, y: 40.0 });
        app.handle_pointer(PointerEvent::Move { x: 200.0, y: 200.0 });
        app.handle_pointer(PointerEvent::Up);
    }

    #[test]
    fn test_classify_appends_top_label_and_resets_canvas() {
        let mut app = ready_app();
        draw_line(&mut app);
        assert!(!app.canvas().bitmap().unwrap().is_blank());

        app.dispatch(Command::Classify);
        assert!(app.canvas().bitmap().unwrap().is_blank());
        assert!(!app.can_classify());

        wait_until(&mut app, |app| !app.session().is_classifying());
        assert_eq!(app.session().text, "나");
        let alternates: Vec<_> = app.session().alternates().map(|(_, l)| l.to_string()).collect();
        assert_eq!(alternates, vec!["라", "가", "다", "마"]);
    }

    #[test]
    fn test_pick_alternate_replaces_last_character() {
        let mut app = ready_app();
        draw_line(&mut app);
        app.dispatch(Command::Classify);
        wait_until(&mut app, |app| !app.session().is_classifying());

        app.dispatch(Command::PickAlternate(1));
        assert_eq!(app.session().text, "라");
    }

    #[test]
    fn test_clear_discards_in_flight_classification() {
        let mut app = ready_app();
        draw_line(&mut app);
        app.dispatch(Command::Classify);
        app.dispatch(Command::Clear);

        // Give the worker time to answer; the answer must be ignored
        std::thread::sleep(Duration::from_millis(50));
        app.poll_events();
        assert!(app.session().text.is_empty());
        assert!(app.session().ranked().is_empty());
    }

    #[test]
    fn test_classify_before_ready_is_refused() {
        let mut app = HangulApp::with_translator(AppConfig::default(), Arc::new(EchoTranslator)).unwrap();
        app.dispatch(Command::Classify);
        assert!(!app.session().is_classifying());
        assert!(app.session().last_error.is_some());
    }

    #[test]
    fn test_failed_load_keeps_classify_disabled() {
        let mut app = HangulApp::with_translator(AppConfig::default(), Arc::new(EchoTranslator)).unwrap();
        app.start_classifier_with(|| {
            Err(ScribeError::Configuration("label file missing".into()).into())
        })
        .unwrap();
        wait_until(&mut app, |app| matches!(app.status(), ClassifierStatus::Failed(_)));
        assert!(!app.can_classify());
    }

    #[test]
    fn test_restart_reloads_ready_classifier() {
        let mut app = ready_app();
        app.start_classifier_with(loaded).unwrap();
        wait_until(&mut app, |app| app.status().is_ready());

        draw_line(&mut app);
        app.dispatch(Command::Classify);
        wait_until(&mut app, |app| !app.session().is_classifying());
        assert_eq!(app.session().text, "나");
    }

    #[test]
    fn test_restart_after_failure_recovers() {
        let mut app = HangulApp::with_translator(AppConfig::default(), Arc::new(EchoTranslator)).unwrap();
        app.on_view_resized(256.0, 256.0);
        app.start_classifier_with(|| {
            Err(ScribeError::Configuration("label file missing".into()).into())
        })
        .unwrap();
        wait_until(&mut app, |app| matches!(app.status(), ClassifierStatus::Failed(_)));

        app.start_classifier_with(loaded).unwrap();
        wait_until(&mut app, |app| app.status().is_ready());
        assert!(app.can_classify());
    }

    #[test]
    fn test_restart_while_loading_is_refused() {
        let mut app = HangulApp::with_translator(AppConfig::default(), Arc::new(EchoTranslator)).unwrap();
        let (release, gate) = crossbeam_channel::bounded::<()>(0);
        app.start_classifier_with(move || {
            let _ = gate.recv();
            loaded()
        })
        .unwrap();

        assert!(app.start_classifier_with(loaded).is_err());
        assert_eq!(app.status(), ClassifierStatus::Loading);

        release.send(()).unwrap();
        wait_until(&mut app, |app| app.status().is_ready());
    }

    #[test]
    fn test_pointer_events_dropped_until_view_measured() {
        let mut app = HangulApp::with_translator(AppConfig::default(), Arc::new(EchoTranslator)).unwrap();
        assert!(!app.handle_pointer(PointerEvent::Down { x: 10.0, y: 10.0 }));
        assert!(app.canvas().is_empty());

        app.on_view_resized(128.0, 128.0);
        assert!(app.handle_pointer(PointerEvent::Down { x: 10.0, y: 10.0 }));
        assert!(!app.canvas().is_empty());
    }

    #[test]
    fn test_submit_translates_text() {
        let mut app = ready_app();
        draw_line(&mut app);
        app.dispatch(Command::Classify);
        wait_until(&mut app, |app| !app.session().is_classifying());

        app.dispatch(Command::Submit);
        wait_until(&mut app, |app| !app.session().is_translating());
        assert_eq!(app.session().translation, "en:나");
        assert_eq!(app.session().alternates().count(), 0);
    }

    #[test]
    fn test_detach_then_attach_restores_ink() {
        let mut app = ready_app();
        draw_line(&mut app);
        let before = app.canvas().bitmap().unwrap().clone();

        app.detach();
        assert!(app.canvas().bitmap().is_none());
        app.attach();
        assert_eq!(app.canvas().bitmap().unwrap(), &before);
    }
}

//! Classifier model loading for ONNX Runtime
//!
//! Resolves and verifies the model artifact and its label file, and wraps the
//! inference session behind the [`Classifier`] trait.

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::TensorRef;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{AppConfig, ModelSettings};
use crate::error::ScribeError;
use crate::vision::labels::LabelVocabulary;
use crate::vision::preprocess::FeedTensor;

/// Opaque model: feed tensor in, one raw score per label out
pub trait Classifier: Send {
    /// Run a forward pass
    fn classify(&mut self, input: &FeedTensor) -> Result<Vec<f32>>;

    /// Number of scores the model declares, when known before running
    fn output_width(&self) -> Option<usize> {
        None
    }
}

/// Locations of the model artifact and its labels
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAssets {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
}

impl ModelAssets {
    /// Resolve paths from settings, falling back to the data directory
    pub fn resolve(settings: &ModelSettings) -> Result<Self> {
        let models_dir = match (&settings.model_path, &settings.labels_path) {
            (Some(_), Some(_)) => None,
            _ => Some(crate::storage::get_models_dir()?),
        };
        Ok(Self::resolve_in(settings, models_dir.as_deref().unwrap_or(Path::new("."))))
    }

    /// Resolve paths from settings relative to an explicit models directory
    pub fn resolve_in(settings: &ModelSettings, models_dir: &Path) -> Self {
        Self {
            model_path: settings
                .model_path
                .clone()
                .unwrap_or_else(|| models_dir.join(crate::storage::MODEL_FILE)),
            labels_path: settings
                .labels_path
                .clone()
                .unwrap_or_else(|| models_dir.join(crate::storage::LABEL_FILE)),
        }
    }
}

/// Compute the hex SHA-256 of a file
pub fn file_sha256(path: &Path) -> Result<String> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fail with a configuration error when the file hash differs from `expected`
pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let actual = file_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(ScribeError::Configuration(format!(
            "checksum mismatch for {:?}: expected {}, got {}",
            path, expected, actual
        ))
        .into());
    }
    info!("Checksum verified for {:?}", path);
    Ok(())
}

/// Classifier and vocabulary, checked against each other
pub struct LoadedModel {
    pub classifier: Box<dyn Classifier>,
    pub vocabulary: LabelVocabulary,
}

/// Load vocabulary and model described by the configuration
pub fn load_model(config: &AppConfig) -> Result<LoadedModel> {
    let assets = ModelAssets::resolve(&config.model)?;
    load_model_from(&assets, &config.model, config.canvas.feed_dim)
}

/// Load vocabulary and model from explicit paths
pub fn load_model_from(assets: &ModelAssets, settings: &ModelSettings, feed_dim: u32) -> Result<LoadedModel> {
    let vocabulary = LabelVocabulary::load(&assets.labels_path)?;

    if !assets.model_path.is_file() {
        return Err(ScribeError::Configuration(format!(
            "model file not found at {:?}",
            assets.model_path
        ))
        .into());
    }
    if let Some(expected) = &settings.sha256 {
        verify_checksum(&assets.model_path, expected)?;
    }

    let classifier = OnnxClassifier::load(&assets.model_path, settings, feed_dim)?;
    if let Some(width) = classifier.output_width() {
        vocabulary.check_output_width(width)?;
    }

    Ok(LoadedModel {
        classifier: Box::new(classifier),
        vocabulary,
    })
}

/// ONNX Runtime session configured with the graph's node names
pub struct OnnxClassifier {
    session: Session,
    input_node: String,
    keep_prob_node: Option<String>,
    output_node: String,
    keep_prob: f32,
    feed_dim: usize,
    output_width: Option<usize>,
}

impl OnnxClassifier {
    /// Create a session from a model file and check the configured nodes exist
    pub fn load(model_path: &Path, settings: &ModelSettings, feed_dim: u32) -> Result<Self> {
        info!("Loading classifier model from {:?}", model_path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(settings.intra_threads.max(1))?
            .commit_from_file(model_path)
            .context("Failed to load ONNX model")?;

        let input_names: Vec<String> = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();

        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        info!(
            "Model loaded. Inputs: {:?}, Outputs: {:?}",
            input_names, output_names
        );

        let mut required = vec![settings.input_node.as_str()];
        if let Some(keep) = settings.keep_prob_node.as_deref() {
            required.push(keep);
        }
        for name in required {
            if !input_names.iter().any(|n| n == name) {
                return Err(ScribeError::Configuration(format!(
                    "model has no input node '{}' (inputs: {:?})",
                    name, input_names
                ))
                .into());
            }
        }

        let output = session
            .outputs
            .iter()
            .find(|output| output.name == settings.output_node)
            .ok_or_else(|| {
                ScribeError::Configuration(format!(
                    "model has no output node '{}' (outputs: {:?})",
                    settings.output_node, output_names
                ))
            })?;

        let output_width = declared_width(&extract_shape(&output.output_type));
        debug!("Declared output width: {:?}", output_width);

        Ok(Self {
            session,
            input_node: settings.input_node.clone(),
            keep_prob_node: settings.keep_prob_node.clone(),
            output_node: settings.output_node.clone(),
            keep_prob: settings.keep_prob,
            feed_dim: feed_dim as usize,
            output_width,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, input: &FeedTensor) -> Result<Vec<f32>> {
        if input.dim() != self.feed_dim {
            return Err(ScribeError::InvalidInput(format!(
                "feed tensor is {}x{}, model expects {}x{}",
                input.dim(),
                input.dim(),
                self.feed_dim,
                self.feed_dim
            ))
            .into());
        }

        let image = input.to_input_array();
        let keep = ndarray::arr0(self.keep_prob);

        let outputs = match self.keep_prob_node.as_deref() {
            Some(keep_node) => self.session.run(ort::inputs![
                self.input_node.as_str() => TensorRef::from_array_view(image.view())?,
                keep_node => TensorRef::from_array_view(keep.view())?,
            ])?,
            None => self.session.run(ort::inputs![
                self.input_node.as_str() => TensorRef::from_array_view(image.view())?,
            ])?,
        };

        let (_, scores) = outputs[self.output_node.as_str()]
            .try_extract_tensor::<f32>()
            .context("Classifier output is not a float tensor")?;

        Ok(scores.to_vec())
    }

    fn output_width(&self) -> Option<usize> {
        self.output_width
    }
}

/// Extract shape from ONNX value type
fn extract_shape(value_type: &ort::value::ValueType) -> Vec<i64> {
    if let Some(shape) = value_type.tensor_shape() {
        shape.iter().map(|&d| d).collect()
    } else {
        vec![]
    }
}

/// Width of the last axis when the model declares a fixed size
fn declared_width(shape: &[i64]) -> Option<usize> {
    shape.last().copied().filter(|&d| d > 0).map(|d| d as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_resolve_defaults_into_models_dir() {
        let settings = ModelSettings::default();
        let assets = ModelAssets::resolve_in(&settings, Path::new("/data/models"));

        assert_eq!(assets.model_path, PathBuf::from("/data/models/hangul.onnx"));
        assert_eq!(
            assets.labels_path,
            PathBuf::from("/data/models/2350-common-hangul.txt")
        );
    }

    #[test]
    fn test_resolve_keeps_explicit_paths() {
        let settings = ModelSettings {
            model_path: Some(PathBuf::from("/opt/m.onnx")),
            labels_path: Some(PathBuf::from("/opt/l.txt")),
            ..Default::default()
        };
        let assets = ModelAssets::resolve(&settings).unwrap();
        assert_eq!(assets.model_path, PathBuf::from("/opt/m.onnx"));
        assert_eq!(assets.labels_path, PathBuf::from("/opt/l.txt"));
    }

    #[test]
    fn test_checksum_verification() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hangul").unwrap();
        let hash = file_sha256(file.path()).unwrap();
        assert_eq!(hash.len(), 64);

        assert!(verify_checksum(file.path(), &hash).is_ok());
        assert!(verify_checksum(file.path(), &hash.to_uppercase()).is_ok());

        let err = verify_checksum(file.path(), "deadbeef").unwrap_err();
        let scribe = err.downcast_ref::<ScribeError>().unwrap();
        assert!(scribe.is_fatal());
    }

    #[test]
    fn test_missing_model_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let labels_path = dir.path().join("labels.txt");
        std::fs::write(&labels_path, "가\n나\n").unwrap();

        let assets = ModelAssets {
            model_path: dir.path().join("missing.onnx"),
            labels_path,
        };
        let err = load_model_from(&assets, &ModelSettings::default(), 64).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_labels_fail_before_model() {
        let dir = TempDir::new().unwrap();
        let assets = ModelAssets::resolve_in(&ModelSettings::default(), dir.path());
        let err = load_model_from(&assets, &ModelSettings::default(), 64).err().unwrap();
        assert!(err.to_string().contains("label file"));
    }

    #[test]
    fn test_declared_width() {
        assert_eq!(declared_width(&[1, 2350]), Some(2350));
        assert_eq!(declared_width(&[-1, -1]), None);
        assert_eq!(declared_width(&[]), None);
    }
}

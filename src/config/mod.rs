//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ScribeError;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Drawing surface settings
    pub canvas: CanvasSettings,
    /// Classifier model settings
    pub model: ModelSettings,
    /// Ranking settings
    pub ranking: RankingSettings,
    /// Translation service settings
    pub translation: TranslationSettings,
}

/// Drawing surface settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    /// Side length of the logical bitmap drawn on screen
    pub display_dim: u32,
    /// Side length of the classifier input
    pub feed_dim: u32,
    /// Ink width in logical pixels
    pub stroke_width: f32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            display_dim: 128,
            feed_dim: 64,
            stroke_width: 6.0,
        }
    }
}

/// Classifier model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model artifact path (None = `<data dir>/models/hangul.onnx`)
    pub model_path: Option<PathBuf>,
    /// Label file path (None = `<data dir>/models/2350-common-hangul.txt`)
    pub labels_path: Option<PathBuf>,
    /// Name of the image input node
    pub input_node: String,
    /// Name of the dropout keep-probability input, if the model has one
    pub keep_prob_node: Option<String>,
    /// Name of the score output node
    pub output_node: String,
    /// Value fed to the keep-probability input at inference time
    pub keep_prob: f32,
    /// Expected SHA-256 of the model file (hex)
    pub sha256: Option<String>,
    /// Intra-op threads for the inference session
    pub intra_threads: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            input_node: "input".to_string(),
            keep_prob_node: Some("keep_prob".to_string()),
            output_node: "output".to_string(),
            keep_prob: 1.0,
            sha256: None,
            intra_threads: 4,
        }
    }
}

/// Ranking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// Number of labels returned per classification
    pub top_n: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

/// Translation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// Base URL of the translation service
    pub endpoint: String,
    /// API key (sent as basic auth password)
    pub api_key: String,
    /// Language of recognized text
    pub source_lang: String,
    /// Language to translate into
    pub target_lang: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            source_lang: "ko".to_string(),
            target_lang: "en".to_string(),
            timeout_secs: 30,
        }
    }
}

impl TranslationSettings {
    /// Whether enough is configured to attempt a request
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

impl AppConfig {
    /// Check settings the pipeline cannot run without
    pub fn validate(&self) -> Result<(), ScribeError> {
        let canvas = &self.canvas;
        if canvas.display_dim == 0 || canvas.feed_dim == 0 {
            return Err(ScribeError::Configuration(
                "canvas dimensions must be positive".into(),
            ));
        }
        if canvas.feed_dim > canvas.display_dim {
            return Err(ScribeError::Configuration(format!(
                "feed_dim {} exceeds display_dim {}",
                canvas.feed_dim, canvas.display_dim
            )));
        }
        if !(canvas.stroke_width > 0.0) {
            return Err(ScribeError::Configuration("stroke_width must be positive".into()));
        }
        if self.ranking.top_n == 0 {
            return Err(ScribeError::Configuration("top_n must be at least 1".into()));
        }
        if self.model.input_node.is_empty() || self.model.output_node.is_empty() {
            return Err(ScribeError::Configuration("model node names must not be empty".into()));
        }
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.canvas.display_dim, 128);
        assert_eq!(config.canvas.feed_dim, 64);
        assert!((config.canvas.stroke_width - 6.0).abs() < 0.01);

        assert!(config.model.model_path.is_none());
        assert_eq!(config.model.input_node, "input");
        assert_eq!(config.model.keep_prob_node.as_deref(), Some("keep_prob"));
        assert_eq!(config.model.output_node, "output");
        assert!((config.model.keep_prob - 1.0).abs() < f32::EPSILON);

        assert_eq!(config.ranking.top_n, 5);

        assert_eq!(config.translation.source_lang, "ko");
        assert_eq!(config.translation.target_lang, "en");
        assert!(!config.translation.is_configured());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.model.model_path = Some(PathBuf::from("/opt/models/hangul.onnx"));
        config.model.sha256 = Some("abc123".to_string());
        config.ranking.top_n = 3;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [canvas]
            feed_dim = 32

            [translation]
            endpoint = "https://translate.example.com"
            api_key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.canvas.feed_dim, 32);
        assert_eq!(parsed.canvas.display_dim, 128);
        assert_eq!(parsed.ranking.top_n, 5);
        assert!(parsed.translation.is_configured());
        assert_eq!(parsed.translation.timeout_secs, 30);
    }

    #[test]
    fn test_validate_rejects_bad_canvas() {
        let mut config = AppConfig::default();
        config.canvas.feed_dim = 256;
        assert!(matches!(config.validate(), Err(ScribeError::Configuration(_))));

        let mut config = AppConfig::default();
        config.canvas.display_dim = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.canvas.stroke_width = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_n() {
        let mut config = AppConfig::default();
        config.ranking.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.translation.target_lang = "ja".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.translation.target_lang, "ja");
        assert_eq!(loaded.canvas, config.canvas);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}

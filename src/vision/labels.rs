//! Label vocabulary: one label per line, line order is the class index

use std::path::Path;

use tracing::info;

use crate::error::ScribeError;

/// Immutable index-to-label mapping aligned with classifier outputs
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    /// Build from an in-memory list
    pub fn from_labels(labels: Vec<String>) -> Result<Self, ScribeError> {
        if labels.is_empty() {
            return Err(ScribeError::Configuration("label vocabulary is empty".into()));
        }
        Ok(Self { labels })
    }

    /// Parse file contents, one label per line
    pub fn parse(content: &str) -> Result<Self, ScribeError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        Self::from_labels(content.lines().map(str::to_string).collect())
    }

    /// Read a label file from disk
    pub fn load(path: &Path) -> Result<Self, ScribeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScribeError::Configuration(format!("cannot read label file {:?}: {}", path, e))
        })?;
        let vocabulary = Self::parse(&content)?;
        info!("Loaded {} labels from {:?}", vocabulary.len(), path);
        Ok(vocabulary)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Fail unless the classifier produces exactly one score per label
    pub fn check_output_width(&self, width: usize) -> Result<(), ScribeError> {
        if width == self.labels.len() {
            Ok(())
        } else {
            Err(ScribeError::Configuration(format!(
                "classifier produces {} scores but vocabulary has {} labels",
                width,
                self.labels.len()
            )))
        }
    }
}

#[cfg(test)]
impl LabelVocabulary {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_preserves_line_order() {
        let vocabulary = LabelVocabulary::parse("가\n각\n간\n").unwrap();
        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.get(0), Some("가"));
        assert_eq!(vocabulary.get(2), Some("간"));
        assert_eq!(vocabulary.get(3), None);
    }

    #[test]
    fn test_parse_handles_crlf_and_bom() {
        let vocabulary = LabelVocabulary::parse("\u{feff}가\r\n나\r\n").unwrap();
        assert_eq!(vocabulary.labels(), &["가".to_string(), "나".to_string()]);
    }

    #[test]
    fn test_empty_vocabulary_is_configuration_error() {
        assert!(matches!(
            LabelVocabulary::parse(""),
            Err(ScribeError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "가\n나\n다\n라\n마\n").unwrap();

        let vocabulary = LabelVocabulary::load(file.path()).unwrap();
        assert_eq!(vocabulary.len(), 5);
        assert_eq!(vocabulary.get(4), Some("마"));
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let err = LabelVocabulary::load(Path::new("/nonexistent/labels.txt")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_output_width_check() {
        let vocabulary = LabelVocabulary::parse("가\n나\n").unwrap();
        assert!(vocabulary.check_output_width(2).is_ok());
        assert!(matches!(
            vocabulary.check_output_width(2350),
            Err(ScribeError::Configuration(_))
        ));
    }
}

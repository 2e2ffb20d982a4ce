use std::path::Path;
use tracing::{info, warn};

use crate::error::AppError;

pub const DEFAULT_LABELS: [&str; 4] = ["SAFE", "DEFACEMENT", "MALWARE", "PHISHING"];

pub const SAFE_LABEL: &str = "SAFE";

/// Class names index-aligned with the classifier's output classes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLabels {
    labels: Vec<String>,
}

impl Default for ClassLabels {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClassLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Reads the label encoder's class list (a JSON array of strings), falling
    /// back to the default four classes.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(labels) => {
                info!("Loaded label encoder with classes: {:?}", labels.labels);
                labels
            }
            Err(e) => {
                let labels = Self::default();
                warn!(
                    "Failed to load label classes from {} ({}), using default class names: {:?}",
                    path.display(),
                    e,
                    labels.labels
                );
                labels
            }
        }
    }

    fn read(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let labels: Vec<String> = serde_json::from_str(&content)?;
        Ok(Self { labels })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index, or the index itself when the label set is
    /// too short.
    pub fn label_for(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_labels() {
        let labels = ClassLabels::default();
        assert_eq!(labels.as_slice(), &DEFAULT_LABELS);
        assert_eq!(labels.label_for(0), SAFE_LABEL);
        assert_eq!(labels.label_for(3), "PHISHING");
    }

    #[test]
    fn test_out_of_range_index_is_stringified() {
        let labels = ClassLabels::new(vec!["benign".to_string(), "phishing".to_string()]);
        assert_eq!(labels.label_for(1), "phishing");
        assert_eq!(labels.label_for(2), "2");
        assert_eq!(ClassLabels::new(Vec::new()).label_for(0), "0");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["benign", "defacement", "malware", "phishing"]"#).unwrap();
        let labels = ClassLabels::load(file.path());
        assert_eq!(labels.label_for(0), "benign");
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn test_load_missing_falls_back_to_default() {
        let labels = ClassLabels::load("/nonexistent/label_classes.json");
        assert_eq!(labels, ClassLabels::default());
    }
}

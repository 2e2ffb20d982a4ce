use std::path::Path;
use tracing::{info, warn};

use crate::{error::AppError, features::ExtractedFeatures};

/// Ordered column names the classifier was trained on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Reads a JSON array of column names. Any failure is logged and yields
    /// an empty schema so the service still starts.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::read(path) {
            Ok(schema) => {
                info!("Loaded {} feature columns from {}", schema.len(), path.display());
                schema
            }
            Err(e) => {
                warn!("Failed to load feature columns from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let columns: Vec<String> = serde_json::from_str(&content)?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Lays features out in column order. Missing names become 0 and extra
    /// names are ignored; positional input must match the schema length.
    pub fn assemble(&self, features: &ExtractedFeatures) -> Result<Vec<f64>, AppError> {
        match features {
            ExtractedFeatures::Named(map) => Ok(self
                .columns
                .iter()
                .map(|name| map.get(name).copied().unwrap_or(0.0))
                .collect()),
            ExtractedFeatures::Positional(values) => {
                if values.len() != self.columns.len() {
                    return Err(AppError::FeatureLengthMismatch {
                        expected: self.columns.len(),
                        actual: values.len(),
                    });
                }
                Ok(values.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureMap;
    use std::io::Write;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_named_fills_missing_with_zero() {
        let mut map = FeatureMap::new();
        map.insert("url_length".to_string(), 12.0);
        map.insert("count-".to_string(), 2.0);
        map.insert("not_in_schema".to_string(), 99.0);

        let vector = schema(&["count-", "brand_new_column", "url_length"])
            .assemble(&ExtractedFeatures::Named(map))
            .unwrap();
        assert_eq!(vector, vec![2.0, 0.0, 12.0]);
    }

    #[test]
    fn test_empty_schema_gives_empty_vector() {
        let mut map = FeatureMap::new();
        map.insert("url_length".to_string(), 12.0);
        let vector = FeatureSchema::default()
            .assemble(&ExtractedFeatures::Named(map))
            .unwrap();
        assert!(vector.is_empty());
    }

    #[test]
    fn test_positional_exact_length() {
        let vector = schema(&["a", "b"])
            .assemble(&ExtractedFeatures::Positional(vec![1.0, 2.0]))
            .unwrap();
        assert_eq!(vector, vec![1.0, 2.0]);
    }

    #[test]
    fn test_positional_length_mismatch_is_reported() {
        let s = schema(&["a", "b", "c"]);

        let short = s.assemble(&ExtractedFeatures::Positional(vec![1.0]));
        assert!(matches!(
            short,
            Err(AppError::FeatureLengthMismatch { expected: 3, actual: 1 })
        ));

        let long = s.assemble(&ExtractedFeatures::Positional(vec![1.0; 4]));
        assert!(matches!(
            long,
            Err(AppError::FeatureLengthMismatch { expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["count-www", "count@", "url_length"]"#).unwrap();

        let s = FeatureSchema::load(file.path());
        assert_eq!(s.columns(), &["count-www", "count@", "url_length"]);
    }

    #[test]
    fn test_load_missing_or_corrupt_degrades_to_empty() {
        assert!(FeatureSchema::load("/nonexistent/feature_columns.json").is_empty());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(FeatureSchema::load(file.path()).is_empty());
    }
}

use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, info, warn};

use crate::{
    canonical::canonicalize,
    config::Config,
    error::AppError,
    features::{Featurizer, UrlFeaturizer},
    labels::ClassLabels,
    model::{Classifier, GbdtModel},
    schema::FeatureSchema,
    types::{DebugFeatures, Prediction},
    whitelist::Whitelist,
};

/// Read-only scoring context built once at startup and shared by every
/// request. Nothing in here is mutated after construction.
pub struct UrlEngine {
    featurizer: Box<dyn Featurizer>,
    schema: FeatureSchema,
    labels: ClassLabels,
    whitelist: Whitelist,
    classifier: Option<Arc<dyn Classifier>>,
}

impl UrlEngine {
    pub fn new(
        schema: FeatureSchema,
        labels: ClassLabels,
        whitelist: Whitelist,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            featurizer: Box::new(UrlFeaturizer::new()?),
            schema,
            labels,
            whitelist,
            classifier,
        })
    }

    pub fn with_featurizer(mut self, featurizer: Box<dyn Featurizer>) -> Self {
        self.featurizer = featurizer;
        self
    }

    /// Loads the artifacts named in `config`. Missing or corrupt artifacts
    /// degrade instead of failing startup.
    pub fn load(config: &Config) -> Result<Self, AppError> {
        info!("Initializing URL engine...");

        let schema = FeatureSchema::load(&config.feature_columns_path);
        if schema.is_empty() {
            warn!("Feature schema is empty: every assembled vector will be empty");
        }
        let labels = ClassLabels::load(&config.label_classes_path);
        let whitelist = Whitelist::new(config.whitelist_mode, config.extra_safe_domains());
        let classifier = Self::load_classifier(&config.model_path, &schema, &labels);

        info!(
            "Whitelist mode {:?} with {} safe domains",
            whitelist.mode(),
            whitelist.domains().len()
        );

        Self::new(schema, labels, whitelist, classifier)
    }

    fn load_classifier(
        path: &str,
        schema: &FeatureSchema,
        labels: &ClassLabels,
    ) -> Option<Arc<dyn Classifier>> {
        match GbdtModel::load(path) {
            Ok(model) => {
                if model.num_features() != schema.len() {
                    warn!(
                        "Model expects {} features but the schema has {} columns",
                        model.num_features(),
                        schema.len()
                    );
                }
                if !model.feature_names().is_empty() && model.feature_names() != schema.columns() {
                    debug!(
                        "Model feature names {:?} differ from schema columns {:?}",
                        model.feature_names(),
                        schema.columns()
                    );
                }
                if model.num_classes() != labels.len() {
                    warn!(
                        "Model has {} classes but {} labels are configured",
                        model.num_classes(),
                        labels.len()
                    );
                }
                Some(Arc::new(model))
            }
            Err(e) => {
                error!("Failed to load model from {}: {}", path, e);
                None
            }
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Canonicalizes `url` and lays its features out in schema order.
    pub fn feature_vector(&self, url: &str) -> Result<Vec<f64>, AppError> {
        let normalized = canonicalize(url);
        let features = self.featurizer.extract(&normalized)?;
        self.schema.assemble(&features)
    }

    pub fn debug_features(&self, url: &str) -> Result<DebugFeatures, AppError> {
        Ok(DebugFeatures {
            columns: self.schema.columns().to_vec(),
            values: self.feature_vector(url)?,
        })
    }

    /// Whitelist first, then the classifier. A whitelisted URL is SAFE even
    /// when no model is loaded.
    pub fn predict(&self, url: &str) -> Result<Prediction, AppError> {
        let normalized = canonicalize(url);
        debug!("Predicting for: {} -> {}", url, normalized);

        if self.whitelist.is_whitelisted(&normalized) {
            debug!("{} is whitelisted", normalized);
            return Ok(Prediction::whitelisted(url, normalized));
        }

        let classifier = self.classifier.as_ref().ok_or(AppError::ModelUnavailable)?;

        let features = self.featurizer.extract(&normalized)?;
        let vector = self.schema.assemble(&features)?;
        let (index, probabilities) = classifier.predict(&vector)?;
        let label = self.labels.label_for(index);

        let probabilities = probabilities.map(|probs| {
            self.labels
                .as_slice()
                .iter()
                .cloned()
                .zip(probs)
                .collect::<BTreeMap<_, _>>()
        });
        if probabilities.is_none() {
            debug!("No probabilities available for {}", normalized);
        }

        info!("Prediction for {}: {}", normalized, label);

        Ok(Prediction {
            url: url.to_string(),
            normalized,
            label,
            probabilities,
            whitelisted: false,
        })
    }
}

//! Classifier seam and the gradient-boosted tree ensemble behind it.
//!
//! Models are read from LightGBM's JSON dump (`Booster.dump_model()`), which
//! carries every tree with its split thresholds and leaf values. Evaluation
//! sums one tree per class per boosting iteration, then applies the
//! objective's output transform.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::error::AppError;

/// Anything that can score an assembled feature vector.
pub trait Classifier: Send + Sync {
    /// Index of the predicted class.
    fn predict_class(&self, features: &[f64]) -> Result<usize, AppError>;

    /// Probability per class, index-aligned with the class labels. `None`
    /// when the classifier cannot produce one.
    fn predict_proba(&self, _features: &[f64]) -> Option<Vec<f64>> {
        None
    }

    /// Class index together with the probabilities, when available.
    /// Implementations that derive the class from the probabilities should
    /// override this to score the vector once.
    fn predict(&self, features: &[f64]) -> Result<(usize, Option<Vec<f64>>), AppError> {
        Ok((self.predict_class(features)?, self.predict_proba(features)))
    }
}

// LightGBM treats values this close to zero as zero for `missing_type: Zero`.
const ZERO_THRESHOLD: f64 = 1e-35;

#[derive(Debug, Clone, Deserialize)]
struct ModelDump {
    #[serde(default = "default_num_class")]
    num_class: usize,
    #[serde(default)]
    num_tree_per_iteration: Option<usize>,
    max_feature_idx: usize,
    objective: String,
    #[serde(default)]
    average_output: bool,
    #[serde(default)]
    feature_names: Vec<String>,
    tree_info: Vec<TreeInfo>,
}

fn default_num_class() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
struct TreeInfo {
    tree_structure: Node,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split(Box<Split>),
    Leaf(Leaf),
}

#[derive(Debug, Clone, Deserialize)]
struct Split {
    split_feature: usize,
    threshold: Threshold,
    decision_type: String,
    #[serde(default = "default_left")]
    default_left: bool,
    #[serde(default)]
    missing_type: MissingType,
    left_child: Node,
    right_child: Node,
}

fn default_left() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct Leaf {
    leaf_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Threshold {
    Numeric(f64),
    /// Categorical splits list the categories going left as `"1||4||7"`.
    Categories(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
enum MissingType {
    #[default]
    None,
    Zero,
    NaN,
}

#[derive(Debug, Clone, PartialEq)]
enum Objective {
    Binary { sigmoid: f64 },
    Multiclass,
    MulticlassOva { sigmoid: f64 },
}

impl Objective {
    fn parse(spec: &str) -> Result<Self, AppError> {
        let mut tokens = spec.split_whitespace();
        let name = tokens.next().unwrap_or_default();
        let sigmoid = tokens
            .filter_map(|t| t.strip_prefix("sigmoid:"))
            .find_map(|v| v.parse::<f64>().ok())
            .unwrap_or(1.0);

        match name {
            "binary" | "cross_entropy" | "xentropy" => Ok(Objective::Binary { sigmoid }),
            "multiclass" | "softmax" => Ok(Objective::Multiclass),
            "multiclassova" | "multiclass_ova" | "ova" | "ovr" => {
                Ok(Objective::MulticlassOva { sigmoid })
            }
            other => Err(AppError::InvalidModel(format!(
                "unsupported objective for classification: {:?}",
                other
            ))),
        }
    }
}

/// Gradient-boosted decision tree ensemble. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct GbdtModel {
    objective: Objective,
    num_class: usize,
    trees_per_iteration: usize,
    num_features: usize,
    average_output: bool,
    feature_names: Vec<String>,
    trees: Vec<Node>,
}

impl GbdtModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let model = Self::from_json(&content)?;
        info!(
            "Loaded tree ensemble from {}: {} trees, {} classes, {} features",
            path.display(),
            model.trees.len(),
            model.num_class,
            model.num_features
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let dump: ModelDump = serde_json::from_str(json)?;
        let objective = Objective::parse(&dump.objective)?;
        let trees_per_iteration = dump.num_tree_per_iteration.unwrap_or(dump.num_class);
        let num_features = dump.max_feature_idx + 1;

        if dump.num_class == 0 || trees_per_iteration != dump.num_class {
            return Err(AppError::InvalidModel(format!(
                "{} trees per iteration for {} classes",
                trees_per_iteration, dump.num_class
            )));
        }
        if dump.tree_info.is_empty() || dump.tree_info.len() % trees_per_iteration != 0 {
            return Err(AppError::InvalidModel(format!(
                "{} trees cannot be split into iterations of {}",
                dump.tree_info.len(),
                trees_per_iteration
            )));
        }

        let trees: Vec<Node> = dump.tree_info.into_iter().map(|t| t.tree_structure).collect();
        for (i, tree) in trees.iter().enumerate() {
            if let Some(feature) = tree.max_split_feature() {
                if feature >= num_features {
                    return Err(AppError::InvalidModel(format!(
                        "tree {} splits on feature {} but the model has {} features",
                        i, feature, num_features
                    )));
                }
            }
        }

        Ok(Self {
            objective,
            num_class: dump.num_class,
            trees_per_iteration,
            num_features,
            average_output: dump.average_output,
            feature_names: dump.feature_names,
            trees,
        })
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of output classes as seen by callers (binary models have two).
    pub fn num_classes(&self) -> usize {
        match self.objective {
            Objective::Binary { .. } => 2,
            _ => self.num_class,
        }
    }

    /// Summed leaf values per tree slot, before the output transform.
    pub fn raw_scores(&self, features: &[f64]) -> Result<Vec<f64>, AppError> {
        if features.len() < self.num_features {
            return Err(AppError::ClassifierInvocation(format!(
                "model expects {} features, got {}",
                self.num_features,
                features.len()
            )));
        }

        let mut scores = vec![0.0; self.trees_per_iteration];
        for (i, tree) in self.trees.iter().enumerate() {
            scores[i % self.trees_per_iteration] += tree.evaluate(features);
        }

        if self.average_output {
            let iterations = (self.trees.len() / self.trees_per_iteration) as f64;
            scores.iter_mut().for_each(|s| *s /= iterations);
        }

        Ok(scores)
    }

    pub fn probabilities(&self, features: &[f64]) -> Result<Vec<f64>, AppError> {
        let raw = self.raw_scores(features)?;
        let probabilities = match self.objective {
            Objective::Binary { sigmoid } => {
                let p = logistic(sigmoid * raw[0]);
                vec![1.0 - p, p]
            }
            Objective::Multiclass => softmax(&raw),
            Objective::MulticlassOva { sigmoid } => {
                raw.iter().map(|s| logistic(sigmoid * s)).collect()
            }
        };
        Ok(probabilities)
    }
}

impl Classifier for GbdtModel {
    fn predict_class(&self, features: &[f64]) -> Result<usize, AppError> {
        Ok(self.predict(features)?.0)
    }

    fn predict_proba(&self, features: &[f64]) -> Option<Vec<f64>> {
        self.probabilities(features).ok()
    }

    fn predict(&self, features: &[f64]) -> Result<(usize, Option<Vec<f64>>), AppError> {
        let probabilities = self.probabilities(features)?;
        let class = argmax(&probabilities);
        debug!("Class scores {:?} -> {}", probabilities, class);
        Ok((class, Some(probabilities)))
    }
}

impl Node {
    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(leaf) => return leaf.leaf_value,
                Node::Split(split) => {
                    node = if split.goes_left(features[split.split_feature]) {
                        &split.left_child
                    } else {
                        &split.right_child
                    };
                }
            }
        }
    }

    fn max_split_feature(&self) -> Option<usize> {
        match self {
            Node::Leaf(_) => None,
            Node::Split(split) => [
                Some(split.split_feature),
                split.left_child.max_split_feature(),
                split.right_child.max_split_feature(),
            ]
            .into_iter()
            .flatten()
            .max(),
        }
    }
}

impl Split {
    fn goes_left(&self, value: f64) -> bool {
        match &self.threshold {
            Threshold::Categories(categories) if self.decision_type == "==" => {
                if value.is_nan() || value < 0.0 {
                    return false;
                }
                let category = value as i64;
                categories
                    .split("||")
                    .filter_map(|c| c.trim().parse::<i64>().ok())
                    .any(|c| c == category)
            }
            Threshold::Categories(raw) => match raw.trim().parse::<f64>() {
                Ok(threshold) => self.numeric_goes_left(value, threshold),
                Err(_) => self.default_left,
            },
            Threshold::Numeric(threshold) => self.numeric_goes_left(value, *threshold),
        }
    }

    fn numeric_goes_left(&self, value: f64, threshold: f64) -> bool {
        if value.is_nan() && self.missing_type == MissingType::NaN {
            return self.default_left;
        }
        let value = if value.is_nan() { 0.0 } else { value };
        if self.missing_type == MissingType::Zero && value.abs() <= ZERO_THRESHOLD {
            return self.default_left;
        }
        value <= threshold
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// First index of the largest value.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

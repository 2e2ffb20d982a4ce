use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::labels::SAFE_LABEL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

/// Outcome of a single classification request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub url: String,
    pub normalized: String,
    pub label: String,
    pub probabilities: Option<BTreeMap<String, f64>>,
    pub whitelisted: bool,
}

impl Prediction {
    pub fn whitelisted(url: &str, normalized: String) -> Self {
        Self {
            url: url.to_string(),
            normalized,
            label: SAFE_LABEL.to_string(),
            probabilities: None,
            whitelisted: true,
        }
    }
}

/// Wire shape of `/predict`. Whitelisted URLs skip the model, so that shape
/// carries no normalized URL or probabilities.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Whitelisted {
        url: String,
        prediction: String,
        whitelisted: bool,
    },
    Classified {
        url: String,
        normalized: String,
        prediction: String,
        probabilities: Option<BTreeMap<String, f64>>,
    },
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        if p.whitelisted {
            PredictResponse::Whitelisted {
                url: p.url,
                prediction: p.label,
                whitelisted: true,
            }
        } else {
            PredictResponse::Classified {
                url: p.url,
                normalized: p.normalized,
                prediction: p.label,
                probabilities: p.probabilities,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugFeatures {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whitelisted_shape() {
        let prediction = Prediction::whitelisted("https://www.github.com/x", "github.com/x".into());
        let value = serde_json::to_value(PredictResponse::from(prediction)).unwrap();
        assert_eq!(
            value,
            json!({"url": "https://www.github.com/x", "prediction": "SAFE", "whitelisted": true})
        );
    }

    #[test]
    fn test_classified_shape_keeps_null_probabilities() {
        let prediction = Prediction {
            url: "http://x.test/a".into(),
            normalized: "x.test/a".into(),
            label: "MALWARE".into(),
            probabilities: None,
            whitelisted: false,
        };
        let value = serde_json::to_value(PredictResponse::from(prediction)).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "http://x.test/a",
                "normalized": "x.test/a",
                "prediction": "MALWARE",
                "probabilities": null
            })
        );
    }
}

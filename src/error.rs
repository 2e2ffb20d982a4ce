use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("Feature mismatch: expected {expected}, got {actual}")]
    FeatureLengthMismatch { expected: usize, actual: usize },

    #[error("Feature extraction error: {0}")]
    ExtractionFailure(String),

    #[error("Classifier invocation failed: {0}")]
    ClassifierInvocation(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable machine-readable tag carried next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ModelUnavailable => "model_unavailable",
            AppError::FeatureLengthMismatch { .. } => "feature_length_mismatch",
            AppError::ExtractionFailure(_) => "extraction_failure",
            AppError::ClassifierInvocation(_) => "classifier_invocation",
            AppError::InvalidModel(_) => "invalid_model",
            AppError::Config(_) => "config",
            AppError::Pattern(_) => "pattern",
            AppError::Serialization(_) => "serialization",
            AppError::Io(_) => "io",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Every failure surfaces as a 500 with a full error shape.
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        match &self {
            AppError::ModelUnavailable => tracing::warn!("Request rejected: {}", self),
            _ => tracing::error!("Internal server error: {}", self),
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

//! Error types for the inference service.
//!
//! Startup failures are fatal. Request failures split into caller errors
//! (the request was wrong) and server faults (the model misbehaved).

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictError>;

/// Fatal errors raised while loading model artifacts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{artifact} not found at {}", .path.display())]
    MissingArtifact {
        artifact: &'static str,
        path: PathBuf,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("threshold must be a finite value in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("feature schema is empty")]
    EmptySchema,

    #[error("duplicate feature name in schema: {0}")]
    DuplicateFeature(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),
}

/// Failure reported by a [`Predictor`](crate::models::Predictor).
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("predictor returned invalid probability {0}")]
    InvalidProbability(f64),

    #[error("feature vector has {actual} values but schema has {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model backend error: {0}")]
    Backend(String),
}

impl From<ort::Error> for PredictorError {
    fn from(err: ort::Error) -> Self {
        PredictorError::Backend(err.to_string())
    }
}

/// Errors terminating a single predict request.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Unknown features in request: {0:?}")]
    UnknownFeature(Vec<String>),

    #[error("Feature {feature} could not be parsed as float: {value}")]
    FeatureParse { feature: String, value: String },

    #[error("Predictor fault: {0}")]
    PredictorFault(#[from] PredictorError),
}

impl PredictError {
    /// True when the caller can fix the request and retry.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, PredictError::PredictorFault(_))
    }

    /// HTTP-style status code carried in error replies.
    pub fn status_code(&self) -> u16 {
        if self.is_caller_error() {
            400
        } else {
            500
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::UnknownFeature(_) => "unknown_feature",
            PredictError::FeatureParse { .. } => "feature_parse",
            PredictError::PredictorFault(_) => "predictor_fault",
        }
    }
}

/// Failure inside the audit sink. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit queue is full")]
    QueueFull,

    #[error("audit writer has stopped")]
    Closed,

    #[error("audit store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PredictError::UnknownFeature(vec!["z".into()]).status_code(), 400);
        let parse = PredictError::FeatureParse {
            feature: "a".into(),
            value: "\"abc\"".into(),
        };
        assert_eq!(parse.status_code(), 400);
        let fault = PredictError::from(PredictorError::InvalidProbability(f64::NAN));
        assert_eq!(fault.status_code(), 500);
        assert!(!fault.is_caller_error());
    }

    #[test]
    fn test_unknown_feature_message_lists_names() {
        let err = PredictError::UnknownFeature(vec!["x".into(), "z".into()]);
        assert_eq!(err.to_string(), r#"Unknown features in request: ["x", "z"]"#);
    }
}

//! Error reply payloads

use crate::error::PredictError;
use serde::{Deserialize, Serialize};

/// Error body sent back in place of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// 400 for caller errors, 500 for server faults
    pub status: u16,
    /// Machine-readable error kind
    pub error: String,
    /// Human-readable detail
    pub detail: String,
}

impl ErrorReply {
    /// Reply for a request body that could not be decoded at all.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            status: 400,
            error: "malformed_request".to_string(),
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: 500,
            error: "internal".to_string(),
            detail: detail.into(),
        }
    }
}

impl From<&PredictError> for ErrorReply {
    fn from(err: &PredictError) -> Self {
        Self {
            status: err.status_code(),
            error: err.kind().to_string(),
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_from_parse_error() {
        let err = PredictError::FeatureParse {
            feature: "age".to_string(),
            value: "old".to_string(),
        };
        let reply = ErrorReply::from(&err);

        assert_eq!(reply.status, 400);
        assert_eq!(reply.error, "feature_parse");
        assert_eq!(reply.detail, "Feature age could not be parsed as float: old");
    }
}

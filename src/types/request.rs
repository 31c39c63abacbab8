//! Incoming predict request payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Caller-supplied feature values keyed by feature name.
///
/// Values stay loosely typed (numbers, numeric strings, null) until the
/// feature vector builder parses them.
pub type RawFeatureInput = HashMap<String, Value>;

/// Predict request body: `{"data": {"feature": value, ...}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    pub data: RawFeatureInput,
}

impl PredictRequest {
    pub fn new(data: RawFeatureInput) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization() {
        let req: PredictRequest =
            serde_json::from_str(r#"{"data": {"age": 52, "density": "3", "bmi": null}}"#).unwrap();

        assert_eq!(req.data.len(), 3);
        assert_eq!(req.data["age"], Value::from(52));
        assert_eq!(req.data["density"], Value::from("3"));
        assert!(req.data["bmi"].is_null());
    }

    #[test]
    fn test_request_requires_data() {
        assert!(serde_json::from_str::<PredictRequest>(r#"{"features": {}}"#).is_err());
    }
}

//! Feature vector construction for model inference.
//!
//! Turns a validated name -> value mapping into a dense vector laid out in
//! schema order, which is the order the model was trained on.

use crate::error::PredictError;
use crate::schema::FeatureSchema;
use crate::types::RawFeatureInput;
use serde_json::Value;

/// Dense numeric model input, positionally aligned to a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Box<[f64]>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Single-precision copy for ONNX tensors.
    pub fn to_f32(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

/// Builds feature vectors in the exact order expected by the model.
pub struct FeatureVectorBuilder;

impl FeatureVectorBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a vector from a request whose keys were already validated.
    ///
    /// Missing features (and explicit `null`s) become 0.0 so callers may
    /// omit features that are structurally absent. Present values must parse
    /// to a finite number; the first one that doesn't, in schema order, fails
    /// the whole request.
    pub fn build(
        &self,
        input: &RawFeatureInput,
        schema: &FeatureSchema,
    ) -> Result<FeatureVector, PredictError> {
        let mut values = Vec::with_capacity(schema.len());

        for name in schema.names() {
            let value = match input.get(name) {
                None | Some(Value::Null) => 0.0,
                Some(raw) => parse_scalar(raw).ok_or_else(|| PredictError::FeatureParse {
                    feature: name.clone(),
                    value: display_raw(raw),
                })?,
            };
            values.push(value);
        }

        Ok(FeatureVector(values.into_boxed_slice()))
    }
}

impl Default for FeatureVectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_scalar(raw: &Value) -> Option<f64> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn display_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn input(value: Value) -> RawFeatureInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_features_default_to_zero() {
        let schema = schema(&["a", "b", "c"]);
        let vector = FeatureVectorBuilder::new()
            .build(&input(json!({"a": 1})), &schema)
            .unwrap();

        assert_eq!(vector.as_slice(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_vector_follows_schema_order() {
        let schema = schema(&["c", "a", "b"]);
        let vector = FeatureVectorBuilder::new()
            .build(&input(json!({"a": 1, "b": 2, "c": 3})), &schema)
            .unwrap();

        assert_eq!(vector.len(), schema.len());
        assert_eq!(vector.as_slice(), &[3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_subset_inputs_keep_schema_length() {
        let schema = schema(&["a", "b", "c", "d"]);
        let builder = FeatureVectorBuilder::new();
        let inputs = [
            json!({}),
            json!({"b": 1}),
            json!({"a": 1, "d": 2}),
            json!({"a": 1, "b": 2, "c": 3, "d": 4}),
        ];
        for data in inputs {
            let vector = builder.build(&input(data), &schema).unwrap();
            assert_eq!(vector.len(), 4);
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let schema = schema(&["a", "b", "c", "d"]);
        let vector = FeatureVectorBuilder::new()
            .build(
                &input(json!({"a": "2", "b": " 1.5 ", "c": "-3e2", "d": true})),
                &schema,
            )
            .unwrap();

        assert_eq!(vector.as_slice(), &[2.0, 1.5, -300.0, 1.0]);
    }

    #[test]
    fn test_null_treated_as_missing() {
        let schema = schema(&["a", "b"]);
        let vector = FeatureVectorBuilder::new()
            .build(&input(json!({"a": null, "b": 4})), &schema)
            .unwrap();

        assert_eq!(vector.as_slice(), &[0.0, 4.0]);
    }

    #[test]
    fn test_unparsable_value_names_feature() {
        let schema = schema(&["a", "b"]);
        let err = FeatureVectorBuilder::new()
            .build(&input(json!({"a": 1, "b": "high"})), &schema)
            .unwrap_err();

        match err {
            PredictError::FeatureParse { feature, value } => {
                assert_eq!(feature, "b");
                assert_eq!(value, "high");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_scalar_and_non_finite_rejected() {
        let schema = schema(&["a"]);
        let builder = FeatureVectorBuilder::new();

        let bad_inputs = [
            json!({"a": [1, 2]}),
            json!({"a": {"x": 1}}),
            json!({"a": "NaN"}),
            json!({"a": "inf"}),
        ];
        for bad in bad_inputs {
            assert!(matches!(
                builder.build(&input(bad), &schema),
                Err(PredictError::FeatureParse { .. })
            ));
        }
    }

    #[test]
    fn test_to_f32() {
        let schema = schema(&["a", "b"]);
        let vector = FeatureVectorBuilder::new()
            .build(&input(json!({"a": 0.5, "b": 2})), &schema)
            .unwrap();

        assert_eq!(vector.to_f32(), vec![0.5_f32, 2.0]);
    }
}

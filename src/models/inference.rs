//! ONNX Runtime backed predictor

use crate::error::PredictorError;
use crate::feature_vector::FeatureVector;
use crate::models::loader::LoadedModel;
use crate::models::predictor::Predictor;
use crate::schema::FeatureSchema;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Predictor scoring a single ONNX binary classifier.
pub struct OnnxPredictor {
    /// Session runs need exclusive access
    model: Mutex<LoadedModel>,
}

impl OnnxPredictor {
    pub fn new(model: LoadedModel) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }

    /// Run the session on one feature row
    fn run(&self, features: &FeatureVector) -> Result<f64, PredictorError> {
        use ort::value::Tensor;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_f32()))?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| PredictorError::Backend(format!("Lock error: {}", e)))?;
        let model = &mut *model;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])?;

        let probability = extract_probability(&outputs, &model.output_name)?;
        Ok(probability)
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, features: &FeatureVector, schema: &FeatureSchema) -> Result<f64, PredictorError> {
        if features.len() != schema.len() {
            return Err(PredictorError::ShapeMismatch {
                expected: schema.len(),
                actual: features.len(),
            });
        }

        let probability = self.run(features)?;
        debug!(probability, features = schema.len(), "ONNX inference complete");
        Ok(probability)
    }
}

/// Extract the positive-class probability from model output.
/// Handles tensor outputs (XGBoost, RandomForest) and seq(map) outputs (CatBoost, LightGBM).
fn extract_probability(
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
) -> Result<f64, PredictorError> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(prob) = extract_from_value(&output) {
            return Ok(prob);
        }
    }

    // Fallback: any non-label output that yields a probability
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(prob) = extract_from_value(&output) {
            debug!(output = %name, prob, "Extracted probability from fallback output");
            return Ok(prob);
        }
    }

    warn!(output = %output_name, "Could not extract probability from model outputs");
    Err(PredictorError::Backend("no probability output found".to_string()))
}

fn extract_from_value(output: &ort::value::DynValue) -> Option<f64> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return positive_class_from_tensor(&dims, data);
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        return extract_from_sequence_map(output).ok();
    }

    None
}

/// Extract probability from seq(map(int64, float)) format
fn extract_from_sequence_map(output: &ort::value::DynValue) -> Result<f64, PredictorError> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| PredictorError::Backend(format!("Failed to downcast to sequence: {}", e)))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps
        .first()
        .ok_or_else(|| PredictorError::Backend("empty output sequence".to_string()))?;

    // batch size is always 1
    let kv_pairs = first.try_extract_key_values::<i64, f32>()?;

    positive_class_from_pairs(&kv_pairs)
        .ok_or_else(|| PredictorError::Backend("no class probability in output map".to_string()))
}

/// Class 1 probability, or its complement from class 0
fn positive_class_from_pairs(pairs: &[(i64, f32)]) -> Option<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Some(*prob as f64);
    }
    pairs
        .iter()
        .find(|(class_id, _)| *class_id == 0)
        .map(|(_, prob)| 1.0 - *prob as f64)
}

/// Pick the positive-class probability out of a tensor
fn positive_class_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = match dims {
        [_, classes] | [classes] => *classes,
        _ => return data.last().map(|&v| v as f64),
    };

    match classes {
        // [batch, 2] or [2] - index 1 is the positive class
        c if c >= 2 => data.get(1).map(|&v| v as f64),
        1 => data.first().map(|&v| v as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|v| (v - expected).abs() < 1e-6)
    }

    #[test]
    fn test_two_class_tensor_uses_index_one() {
        assert!(close(positive_class_from_tensor(&[1, 2], &[0.3, 0.7]), 0.7));
        assert!(close(positive_class_from_tensor(&[2], &[0.8, 0.2]), 0.2));
    }

    #[test]
    fn test_single_value_tensor_uses_index_zero() {
        assert!(close(positive_class_from_tensor(&[1, 1], &[0.42]), 0.42));
        assert!(close(positive_class_from_tensor(&[1], &[0.9]), 0.9));
    }

    #[test]
    fn test_other_ranks_use_last_value() {
        assert!(close(positive_class_from_tensor(&[1, 1, 2], &[0.1, 0.6]), 0.6));
        assert!(close(positive_class_from_tensor(&[], &[0.35]), 0.35));
    }

    #[test]
    fn test_zero_width_tensor_has_no_probability() {
        assert_eq!(positive_class_from_tensor(&[1, 0], &[]), None);
        assert_eq!(positive_class_from_tensor(&[0], &[]), None);
        assert_eq!(positive_class_from_tensor(&[1, 2], &[]), None);
    }

    #[test]
    fn test_class_map_prefers_positive_class() {
        assert!(close(positive_class_from_pairs(&[(0, 0.25), (1, 0.75)]), 0.75));
        assert!(close(positive_class_from_pairs(&[(1, 0.6)]), 0.6));
    }

    #[test]
    fn test_class_map_falls_back_to_negative_complement() {
        assert!(close(positive_class_from_pairs(&[(0, 0.8)]), 0.2));
    }

    #[test]
    fn test_class_map_without_known_classes() {
        assert_eq!(positive_class_from_pairs(&[]), None);
        assert_eq!(positive_class_from_pairs(&[(2, 0.5)]), None);
    }
}

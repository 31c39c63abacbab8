//! Threshold decision over a model probability

use crate::error::PredictorError;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};

/// Binary class assigned to a prediction; serialized as 0 / 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Labeled, confidence-scored outcome returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Positive-class probability from the model (0.0 - 1.0)
    pub probability: f64,
    pub label: Label,
    /// Threshold the label was decided against
    pub threshold: f64,
    /// Probability mass supporting the chosen label
    pub confidence: f64,
    /// Schema order the features were fed to the model in
    pub feature_order: FeatureSchema,
}

/// Converts probabilities into labels against a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    threshold: f64,
}

impl DecisionEngine {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Label is positive when `probability >= threshold`; ties go positive.
    ///
    /// Probabilities outside [0, 1] or non-finite ones are a predictor fault,
    /// never clamped.
    pub fn decide(
        &self,
        probability: f64,
        schema: &FeatureSchema,
    ) -> Result<PredictionResult, PredictorError> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PredictorError::InvalidProbability(probability));
        }

        let label = if probability >= self.threshold {
            Label::Positive
        } else {
            Label::Negative
        };
        let confidence = match label {
            Label::Positive => probability,
            Label::Negative => 1.0 - probability,
        };

        Ok(PredictionResult {
            probability,
            label,
            threshold: self.threshold,
            confidence,
            feature_order: schema.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["a".to_string(), "b".to_string()]).unwrap()
    }

    #[test]
    fn test_tie_goes_positive() {
        let engine = DecisionEngine::new(0.5);
        assert_eq!(engine.decide(0.5, &schema()).unwrap().label, Label::Positive);
        assert_eq!(engine.decide(0.4999, &schema()).unwrap().label, Label::Negative);
    }

    #[test]
    fn test_confidence_follows_label() {
        let engine = DecisionEngine::new(0.5);

        let high = engine.decide(0.8, &schema()).unwrap();
        assert_eq!(high.label, Label::Positive);
        assert!((high.confidence - 0.8).abs() < 1e-12);

        let low = engine.decide(0.2, &schema()).unwrap();
        assert_eq!(low.label, Label::Negative);
        assert!((low.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_below_half_with_low_threshold() {
        let engine = DecisionEngine::new(0.3);
        let result = engine.decide(0.35, &schema()).unwrap();

        assert_eq!(result.label, Label::Positive);
        assert!((result.confidence - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_probability_is_fault() {
        let engine = DecisionEngine::new(0.5);
        for bad in [f64::NAN, f64::INFINITY, -0.1, 1.01] {
            assert!(matches!(
                engine.decide(bad, &schema()),
                Err(PredictorError::InvalidProbability(_))
            ));
        }
    }

    #[test]
    fn test_result_serialization() {
        let result = DecisionEngine::new(0.5).decide(0.75, &schema()).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["label"], 1);
        assert_eq!(json["threshold"], 0.5);
        assert_eq!(json["feature_order"], serde_json::json!(["a", "b"]));
    }
}

//! Scoring contract between the pipeline and a trained model

use crate::error::PredictorError;
use crate::feature_vector::FeatureVector;
use crate::schema::FeatureSchema;

/// Opaque scoring function returning the positive-class probability.
///
/// Implementations must be pure from the caller's point of view and safe to
/// share across concurrently executing requests.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureVector, schema: &FeatureSchema) -> Result<f64, PredictorError>;
}

impl<F> Predictor for F
where
    F: Fn(&FeatureVector, &FeatureSchema) -> Result<f64, PredictorError> + Send + Sync,
{
    fn predict(&self, features: &FeatureVector, schema: &FeatureSchema) -> Result<f64, PredictorError> {
        self(features, schema)
    }
}

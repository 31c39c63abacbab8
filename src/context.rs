//! Process-wide model state, built once at startup and shared read-only.

use crate::config::ModelConfig;
use crate::error::StartupError;
use crate::models::{ArtifactPaths, ModelLoader, ModelMetadata, OnnxPredictor, Predictor};
use crate::schema::FeatureSchema;
use tracing::info;

/// Startup progress of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Loading,
    Ready,
}

/// Immutable bundle of everything a request needs from the trained model.
///
/// Constructed once, then shared behind an `Arc`; nothing in it is mutated
/// after construction, so concurrent requests read it without coordination.
pub struct ModelContext {
    schema: FeatureSchema,
    metadata: ModelMetadata,
    predictor: Box<dyn Predictor>,
    lifecycle: Lifecycle,
}

impl ModelContext {
    /// Assemble a ready context from already-loaded parts
    pub fn new(schema: FeatureSchema, metadata: ModelMetadata, predictor: Box<dyn Predictor>) -> Self {
        Self {
            schema,
            metadata,
            predictor,
            lifecycle: Lifecycle::Ready,
        }
    }

    /// Load every artifact from the configured model directory.
    ///
    /// Any missing or invalid artifact aborts startup.
    pub fn load(config: &ModelConfig) -> Result<Self, StartupError> {
        let mut lifecycle = Lifecycle::Uninitialized;
        info!(?lifecycle, model_dir = %config.model_dir, "Loading model artifacts");

        let paths = ArtifactPaths::from_config(config);
        paths.ensure_present()?;
        lifecycle = Lifecycle::Loading;
        info!(?lifecycle, "All model artifacts present");

        let schema = FeatureSchema::from_json_file(&paths.features)?;
        let metadata = ModelMetadata::from_json_file(&paths.metadata)?;
        let model = ModelLoader::with_threads(config.onnx_threads)?.load_model(&paths.model)?;

        let context = Self::new(schema, metadata, Box::new(OnnxPredictor::new(model)));
        info!(
            lifecycle = ?context.lifecycle,
            features = context.schema.len(),
            threshold = context.metadata.threshold,
            "Model context ready"
        );
        Ok(context)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn threshold(&self) -> f64 {
        self.metadata.threshold
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictorError;
    use crate::feature_vector::FeatureVector;

    #[test]
    fn test_load_fails_fast_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            model_dir: dir.path().to_string_lossy().into_owned(),
            ..ModelConfig::default()
        };

        assert!(matches!(
            ModelContext::load(&config),
            Err(StartupError::MissingArtifact { .. })
        ));
    }

    #[test]
    fn test_new_context_is_ready() {
        let schema = FeatureSchema::new(vec!["a".to_string()]).unwrap();
        let context = ModelContext::new(
            schema,
            ModelMetadata::default(),
            Box::new(|_: &FeatureVector, _: &FeatureSchema| Ok::<_, PredictorError>(0.5)),
        );

        assert_eq!(context.lifecycle(), Lifecycle::Ready);
        assert_eq!(context.threshold(), 0.5);
    }
}

//! Model artifact loading
//!
//! A model directory holds three artifacts: the ONNX model, the ordered
//! feature names, and metadata carrying the decision threshold.

use crate::config::ModelConfig;
use crate::error::StartupError;
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Threshold used when the metadata file doesn't specify one
pub const DEFAULT_THRESHOLD: f64 = 0.5;

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Metadata produced alongside the trained model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModelMetadata {
    /// Probability at or above which the positive label is assigned
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl ModelMetadata {
    pub fn new(threshold: f64) -> Result<Self, StartupError> {
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(StartupError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    /// Load metadata from JSON. Unknown keys are ignored.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| StartupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata: ModelMetadata =
            serde_json::from_str(&raw).map_err(|source| StartupError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(metadata.threshold)
    }
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Resolved locations of the artifacts in a model directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub features: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPaths {
    pub fn from_config(config: &ModelConfig) -> Self {
        let dir = Path::new(&config.model_dir);
        Self {
            model: dir.join(&config.model_file),
            features: dir.join(&config.feature_file),
            metadata: dir.join(&config.metadata_file),
        }
    }

    /// Fail fast if any required artifact is missing.
    pub fn ensure_present(&self) -> Result<(), StartupError> {
        for (artifact, path) in [
            ("model file", &self.model),
            ("feature names file", &self.features),
            ("model metadata file", &self.metadata),
        ] {
            if !path.exists() {
                return Err(StartupError::MissingArtifact {
                    artifact,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Loaded ONNX model with its resolved tensor names
pub struct LoadedModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for probabilities
    pub output_name: String,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self, StartupError> {
        ort::init()
            .commit()
            .map_err(|e| StartupError::ModelLoad(e.to_string()))?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel, StartupError> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(self.onnx_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| StartupError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        info!(
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            session,
            input_name,
            output_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_metadata_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "model_metadata.json", r#"{"threshold": 0.35, "auc": 0.91}"#);

        let metadata = ModelMetadata::from_json_file(&path).unwrap();
        assert_eq!(metadata.threshold, 0.35);
    }

    #[test]
    fn test_metadata_default_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "model_metadata.json", r#"{"trained_at": "2024-05-01"}"#);

        let metadata = ModelMetadata::from_json_file(&path).unwrap();
        assert_eq!(metadata.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_metadata_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "model_metadata.json", r#"{"threshold": 1.5}"#);

        assert!(matches!(
            ModelMetadata::from_json_file(&path),
            Err(StartupError::InvalidThreshold(t)) if t == 1.5
        ));
        assert!(ModelMetadata::new(f64::NAN).is_err());
        assert!(ModelMetadata::new(0.0).is_ok());
        assert!(ModelMetadata::new(1.0).is_ok());
    }

    #[test]
    fn test_missing_artifact_detected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "feature_names.json", r#"["a"]"#);
        write(dir.path(), "model_metadata.json", "{}");

        let config = ModelConfig {
            model_dir: dir.path().to_string_lossy().into_owned(),
            ..ModelConfig::default()
        };
        let paths = ArtifactPaths::from_config(&config);

        match paths.ensure_present() {
            Err(StartupError::MissingArtifact { artifact, path }) => {
                assert_eq!(artifact, "model file");
                assert_eq!(path, dir.path().join("model.onnx"));
            }
            other => panic!("expected missing model, got {other:?}"),
        }
    }
}

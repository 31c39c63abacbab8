//! Model loading, scoring and decision components

pub mod decision;
pub mod inference;
pub mod loader;
pub mod predictor;

pub use decision::{DecisionEngine, Label, PredictionResult};
pub use inference::OnnxPredictor;
pub use loader::{ArtifactPaths, ModelLoader, ModelMetadata};
pub use predictor::Predictor;

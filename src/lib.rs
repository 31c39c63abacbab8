//! Risk Inference Service Library
//!
//! Serves binary risk classifications from a pre-trained model: validates
//! caller features against the model's schema, scores them, applies the
//! decision threshold, and keeps a best-effort audit trail.

pub mod audit;
pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod feature_vector;
pub mod health;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod schema;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use context::ModelContext;
pub use error::{PredictError, PredictorError, StartupError};
pub use feature_vector::{FeatureVector, FeatureVectorBuilder};
pub use health::HealthReport;
pub use models::{Label, PredictionResult, Predictor};
pub use pipeline::InferencePipeline;
pub use schema::FeatureSchema;
pub use types::{PredictRequest, RawFeatureInput};

//! Configuration management for the inference service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Request/reply subject for predictions
    pub predict_subject: String,
    /// Request/reply subject for health checks
    pub health_subject: String,
}

/// Model artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the model artifacts
    pub model_dir: String,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// JSON array of feature names, in model input order
    #[serde(default = "default_feature_file")]
    pub feature_file: String,
    /// JSON object with an optional `threshold`
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_file() -> String {
    "model.onnx".to_string()
}

fn default_feature_file() -> String {
    "feature_names.json".to_string()
}

fn default_metadata_file() -> String {
    "model_metadata.json".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: "models".to_string(),
            model_file: default_model_file(),
            feature_file: default_feature_file(),
            metadata_file: default_metadata_file(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// CSV file receiving one row per prediction
    #[serde(default = "default_audit_path")]
    pub path: String,
    /// Records buffered before new ones are dropped
    #[serde(default = "default_audit_queue")]
    pub queue_capacity: usize,
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_path() -> String {
    "/tmp/request_log.csv".to_string()
}

fn default_audit_queue() -> usize {
    1024
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: default_audit_path(),
            queue_capacity: default_audit_queue(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

/// Periodic metrics summary
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from `RISK_CONFIG` or the default file
    pub fn load() -> Result<Self> {
        let path = std::env::var("RISK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// Environment overrides apply on top of the file: `RISK__SECTION__KEY`
    /// for any value, plus `MODEL_DIR` and `REQUEST_LOG`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("RISK").prefix_separator("__").separator("__"))
            .set_override_option("model.model_dir", std::env::var("MODEL_DIR").ok())
            .context("Invalid MODEL_DIR override")?
            .set_override_option("audit.path", std::env::var("REQUEST_LOG").ok())
            .context("Invalid REQUEST_LOG override")?
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                predict_subject: "risk.predict".to_string(),
                health_subject: "risk.health".to_string(),
            },
            model: ModelConfig::default(),
            audit: AuditConfig::default(),
            pipeline: PipelineConfig { workers: 4 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            metrics: MetricsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.model.model_file, "model.onnx");
        assert_eq!(config.model.feature_file, "feature_names.json");
        assert_eq!(config.audit.path, "/tmp/request_log.csv");
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[nats]
url = "nats://nats:4222"
predict_subject = "svc.predict"
health_subject = "svc.health"

[model]
model_dir = "/srv/model"

[pipeline]
workers = 8

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.nats.predict_subject, "svc.predict");
        assert_eq!(config.model.metadata_file, "model_metadata.json");
        assert_eq!(config.model.onnx_threads, 1);
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.audit.queue_capacity, 1024);
        assert_eq!(config.metrics.report_interval_secs, 60);
    }
}

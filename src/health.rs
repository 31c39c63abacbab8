//! Static process health

use crate::context::{Lifecycle, ModelContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub model_loaded: bool,
    pub threshold: f64,
    pub feature_count: usize,
}

impl HealthReport {
    pub fn from_context(context: &ModelContext) -> Self {
        Self {
            status: "ok".to_string(),
            model_loaded: context.lifecycle() == Lifecycle::Ready,
            threshold: context.threshold(),
            feature_count: context.schema().len(),
        }
    }
}

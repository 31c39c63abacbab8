//! Request pipeline: validate, build, score, decide, audit.

use crate::audit::{AuditRecord, AuditSink};
use crate::context::ModelContext;
use crate::error::Result;
use crate::feature_vector::FeatureVectorBuilder;
use crate::health::HealthReport;
use crate::metrics::PipelineMetrics;
use crate::models::{DecisionEngine, PredictionResult};
use crate::types::RawFeatureInput;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Stateless per-request pipeline over a shared [`ModelContext`].
pub struct InferencePipeline {
    context: Arc<ModelContext>,
    builder: FeatureVectorBuilder,
    decision: DecisionEngine,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<PipelineMetrics>,
}

impl InferencePipeline {
    pub fn new(
        context: Arc<ModelContext>,
        audit: Arc<dyn AuditSink>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let decision = DecisionEngine::new(context.threshold());
        Self {
            context,
            builder: FeatureVectorBuilder::new(),
            decision,
            audit,
            metrics,
        }
    }

    /// Serve one prediction.
    ///
    /// The audit write is queued after the result is decided; its outcome
    /// never changes what is returned.
    pub fn predict(&self, input: &RawFeatureInput) -> Result<PredictionResult> {
        let start = Instant::now();

        match self.score(input) {
            Ok(result) => {
                self.metrics
                    .record_prediction(start.elapsed(), result.probability, result.label);
                self.audit(&result);
                debug!(
                    probability = result.probability,
                    label = %result.label,
                    confidence = result.confidence,
                    elapsed_us = start.elapsed().as_micros(),
                    "Prediction served"
                );
                Ok(result)
            }
            Err(e) if e.is_caller_error() => {
                self.metrics.record_rejection();
                debug!(error = %e, "Request rejected");
                Err(e)
            }
            Err(e) => {
                self.metrics.record_fault();
                error!(error = %e, "Predictor fault");
                Err(e)
            }
        }
    }

    fn score(&self, input: &RawFeatureInput) -> Result<PredictionResult> {
        let schema = self.context.schema();

        schema.validate(input)?;
        let features = self.builder.build(input, schema)?;
        let probability = self.context.predictor().predict(&features, schema)?;

        Ok(self.decision.decide(probability, schema)?)
    }

    fn audit(&self, result: &PredictionResult) {
        if let Err(e) = self.audit.record(AuditRecord::from_result(result)) {
            self.metrics.record_audit_drop();
            debug!(error = %e, "Audit record dropped");
        }
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::from_context(&self.context)
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }
}

//! Risk Inference Service - Main Entry Point
//!
//! Loads the model artifacts, then answers predict and health requests over
//! NATS request/reply until interrupted.

use anyhow::{Context, Result};
use risk_inference_service::{
    audit::{AuditSink, AuditWorker, CsvAuditLog, NoopAuditSink},
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    context::ModelContext,
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::InferencePipeline,
    producer::ReplyPublisher,
    server::PredictionServer,
};
use std::sync::Arc;
use tracing::{info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(format!("risk_inference_service={}", logging.level).parse()?)
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Risk Inference Service");

    // Startup aborts here if any artifact is missing
    let context = Arc::new(ModelContext::load(&config.model).context("Failed to load model")?);
    info!(
        features = context.schema().len(),
        threshold = context.threshold(),
        "Model loaded"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    let (audit, audit_worker): (Arc<dyn AuditSink>, Option<AuditWorker>) = if config.audit.enabled {
        let (log, worker) = CsvAuditLog::spawn(&config.audit.path, config.audit.queue_capacity)
            .context("Failed to start audit writer")?;
        (Arc::new(log) as Arc<dyn AuditSink>, Some(worker))
    } else {
        warn!("Audit log disabled");
        (Arc::new(NoopAuditSink) as Arc<dyn AuditSink>, None)
    };

    let pipeline = Arc::new(InferencePipeline::new(context, audit, metrics.clone()));

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.predict_subject,
        &config.nats.health_subject,
    );
    let publisher = ReplyPublisher::new(client);

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let server = PredictionServer::new(pipeline, consumer, publisher, config.pipeline.workers);
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    // Dropping the server released every audit sender, so the writer drains and exits
    if let Some(worker) = audit_worker {
        tokio::task::spawn_blocking(move || worker.join()).await?;
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

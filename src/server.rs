//! Request/reply serving loop over NATS.

use crate::consumer::RequestConsumer;
use crate::health::HealthReport;
use crate::models::PredictionResult;
use crate::pipeline::InferencePipeline;
use crate::producer::ReplyPublisher;
use crate::types::{ErrorReply, PredictRequest};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Body of a predict reply: the prediction or an error
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictReply {
    Prediction(PredictionResult),
    Error(ErrorReply),
}

/// Decode a predict payload and run it through the pipeline.
pub fn handle_predict(pipeline: &InferencePipeline, payload: &[u8]) -> PredictReply {
    let request: PredictRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            pipeline.metrics().record_rejection();
            return PredictReply::Error(ErrorReply::malformed(format!("Invalid request body: {}", e)));
        }
    };

    match pipeline.predict(&request.data) {
        Ok(result) => PredictReply::Prediction(result),
        Err(e) => PredictReply::Error(ErrorReply::from(&e)),
    }
}

/// Runs predictions on a bounded worker pool.
///
/// Health reports never touch the pool, and [`predict`](Self::predict)
/// takes its worker permit inside the request's own task, so whoever
/// receives requests is never parked behind busy workers.
#[derive(Clone)]
pub struct RequestDispatcher {
    pipeline: Arc<InferencePipeline>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl RequestDispatcher {
    pub fn new(pipeline: Arc<InferencePipeline>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn health(&self) -> HealthReport {
        self.pipeline.health()
    }

    /// Workers not currently scoring
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Wait for a worker, then score the payload on the blocking pool.
    pub async fn predict<P>(&self, payload: P) -> PredictReply
    where
        P: AsRef<[u8]> + Send + 'static,
    {
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return PredictReply::Error(ErrorReply::internal("worker pool closed")),
        };

        let pipeline = self.pipeline.clone();
        // scoring is CPU-bound
        tokio::task::spawn_blocking(move || handle_predict(&pipeline, payload.as_ref()))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Prediction task failed");
                PredictReply::Error(ErrorReply::internal("prediction task failed"))
            })
    }
}

/// Serves predict and health requests until shutdown
pub struct PredictionServer {
    dispatcher: RequestDispatcher,
    consumer: RequestConsumer,
    publisher: ReplyPublisher,
}

impl PredictionServer {
    pub fn new(
        pipeline: Arc<InferencePipeline>,
        consumer: RequestConsumer,
        publisher: ReplyPublisher,
        workers: usize,
    ) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(pipeline, workers),
            consumer,
            publisher,
        }
    }

    /// Process requests until `shutdown` resolves, then wait for in-flight ones.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut predict_sub = self.consumer.subscribe_predict().await?;
        let mut health_sub = self.consumer.subscribe_health().await?;
        let mut in_flight: JoinSet<()> = JoinSet::new();

        info!(workers = self.dispatcher.workers(), "Serving prediction requests");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting requests");
                    break;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Request task failed");
                    }
                }
                message = health_sub.next() => {
                    let Some(message) = message else { break };
                    let Some(reply_to) = message.reply else {
                        warn!(subject = %message.subject, "Health request without reply subject");
                        continue;
                    };
                    let report = self.dispatcher.health();
                    if let Err(e) = self.publisher.reply(reply_to, &report).await {
                        error!(error = %e, "Failed to publish health reply");
                    }
                }
                message = predict_sub.next() => {
                    let Some(message) = message else { break };
                    let Some(reply_to) = message.reply else {
                        warn!(subject = %message.subject, "Predict request without reply subject, dropping");
                        continue;
                    };

                    let dispatcher = self.dispatcher.clone();
                    let publisher = self.publisher.clone();
                    let payload = message.payload;
                    let request_id = uuid::Uuid::new_v4();

                    in_flight.spawn(async move {
                        let reply = dispatcher.predict(payload).await;

                        if let PredictReply::Error(ref err) = reply {
                            debug!(%request_id, status = err.status, error = %err.error, "Replying with error");
                        }
                        if let Err(e) = publisher.reply(reply_to, &reply).await {
                            error!(%request_id, error = %e, "Failed to publish prediction reply");
                        }
                    });
                }
            }
        }

        // Wait for in-flight requests
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Request task failed");
            }
        }
        self.publisher.flush().await.context("Failed to flush replies")?;
        info!("All in-flight requests completed");

        Ok(())
    }
}

//! Test Prediction Client
//!
//! Sends generated predict requests to the service over NATS request/reply
//! and logs the replies.

use rand::Rng;
use risk_inference_service::{FeatureSchema, HealthReport, PredictRequest, RawFeatureInput};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Request generator driven by the model's feature schema
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    schema: FeatureSchema,
}

impl RequestGenerator {
    fn new(schema: FeatureSchema) -> Self {
        Self {
            rng: rand::thread_rng(),
            schema,
        }
    }

    /// Coded feature values; some omitted, some sent as strings
    fn generate_valid(&mut self) -> PredictRequest {
        let mut data = RawFeatureInput::new();
        for name in self.schema.names() {
            if self.rng.gen_bool(0.1) {
                continue;
            }
            let code: u8 = self.rng.gen_range(0..5);
            let value = if self.rng.gen_bool(0.2) {
                Value::from(code.to_string())
            } else {
                Value::from(code)
            };
            data.insert(name.clone(), value);
        }
        PredictRequest::new(data)
    }

    /// Valid request plus one key the schema doesn't know
    fn generate_invalid(&mut self) -> PredictRequest {
        let mut request = self.generate_valid();
        request
            .data
            .insert(format!("unknown_{}", self.rng.gen_range(0..100)), Value::from(1));
        request
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("predict_client=info".parse()?),
        )
        .init();

    info!("Starting Test Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let feature_file = args.get(2).map(|s| s.as_str()).unwrap_or("models/feature_names.json");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let invalid_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    let predict_subject = "risk.predict";
    let health_subject = "risk.health";

    let schema = FeatureSchema::from_json_file(feature_file)?;
    info!(
        nats_url = %nats_url,
        features = schema.len(),
        count = count,
        invalid_rate = invalid_rate,
        "Configuration loaded"
    );

    let mut generator = RequestGenerator::new(schema);
    let mut rng = rand::thread_rng();

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            for i in 0..count.min(3) {
                let request = generator.generate_valid();
                info!("Sample request {}:\n{}", i + 1, serde_json::to_string_pretty(&request)?);
            }
            return Ok(());
        }
    };

    let health = client.request(health_subject, Vec::<u8>::new().into()).await?;
    let report: HealthReport = serde_json::from_slice(&health.payload)?;
    info!(?report, "Service health");

    let mut positives = 0;
    let mut errors = 0;

    for i in 0..count {
        let request = if rng.gen_bool(invalid_rate) {
            generator.generate_invalid()
        } else {
            generator.generate_valid()
        };

        let payload = serde_json::to_vec(&request)?;
        let reply = client.request(predict_subject, payload.into()).await?;
        let body: Value = serde_json::from_slice(&reply.payload)?;

        if let Some(detail) = body.get("detail") {
            errors += 1;
            warn!(request = i + 1, detail = %detail, "Request rejected");
        } else {
            if body["label"] == 1 {
                positives += 1;
            }
            info!(
                request = i + 1,
                probability = %body["probability"],
                label = %body["label"],
                confidence = %body["confidence"],
                "Prediction received"
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} positive, {} errors)",
        count, positives, errors
    );

    Ok(())
}

//! NATS subscriptions for incoming requests

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes to the predict and health request subjects
pub struct RequestConsumer {
    client: Client,
    predict_subject: String,
    health_subject: String,
}

impl RequestConsumer {
    pub fn new(client: Client, predict_subject: &str, health_subject: &str) -> Self {
        Self {
            client,
            predict_subject: predict_subject.to_string(),
            health_subject: health_subject.to_string(),
        }
    }

    pub async fn subscribe_predict(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.predict_subject.clone()).await?;
        info!(subject = %self.predict_subject, "Subscribed to predict subject");
        Ok(subscriber)
    }

    pub async fn subscribe_health(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.health_subject.clone()).await?;
        info!(subject = %self.health_subject, "Subscribed to health subject");
        Ok(subscriber)
    }
}

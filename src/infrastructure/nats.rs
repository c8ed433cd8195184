use async_trait::async_trait;
use tracing::info;

use super::{EventPublisher, PublishError};
use crate::domain::events::OrderEvent;

/// Publishes order events as JSON on `<prefix>.<event subject>`.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self { Self { client, prefix: prefix.into() } }

    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, PublishError> {
        let client = async_nats::connect(url).await.map_err(|e| PublishError(e.to_string()))?;
        Ok(Self::new(client, prefix))
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event).map_err(|e| PublishError(e.to_string()))?;
        let subject = format!("{}.{}", self.prefix, event.subject());
        self.client.publish(subject, payload.into()).await.map_err(|e| PublishError(e.to_string()))
    }
}

/// Used when no broker is configured.
#[derive(Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        info!(order_id = event.order_id(), subject = event.subject(), "order event");
        Ok(())
    }
}

//! Storage and messaging ports with their adapters.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::events::OrderEvent;

pub mod memory;
pub mod nats;
pub mod postgres;

pub use memory::{InMemoryOrderRepository, RecordingPublisher};
pub use nats::{LogPublisher, NatsPublisher};
pub use postgres::PgOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("order document could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("order {0} not found")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result of an idempotent insert.
#[derive(Clone, Debug)]
pub struct InsertOutcome {
    pub order: Order,
    /// `false` when the idempotency key was already used and the stored order is returned instead.
    pub created: bool,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a guest order keyed by its idempotency key.
    async fn create(&self, order: &Order) -> Result<InsertOutcome, RepositoryError>;

    /// Account-scoped insert; the order carries the owner in its customer snapshot.
    async fn create_for_user(&self, user_id: &str, order: &Order) -> Result<InsertOutcome, RepositoryError> {
        if order.customer().user_id.as_deref() != Some(user_id) {
            return Err(RepositoryError::Unavailable(format!("order {} does not belong to user {}", order.id(), user_id)));
        }
        self.create(order).await
    }

    async fn find(&self, id: &str) -> Result<Option<Order>, RepositoryError>;

    async fn save(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError>;
}

#[derive(Debug, Error)]
#[error("event publication failed: {0}")]
pub struct PublishError(pub String);

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError>;
}

/// Best-effort fan-out: failures are logged and dropped.
pub async fn publish_all(publisher: &dyn EventPublisher, events: Vec<OrderEvent>) {
    for event in events {
        if let Err(e) = publisher.publish(&event).await {
            warn!(order_id = event.order_id(), subject = event.subject(), error = %e, "dropping order event");
        }
    }
}

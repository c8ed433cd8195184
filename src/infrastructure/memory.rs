//! In-process adapters, used when no database or broker is configured and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

use super::{EventPublisher, InsertOutcome, OrderRepository, PublishError, RepositoryError};
use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::events::OrderEvent;

#[derive(Default)]
struct Store {
    orders: HashMap<String, Order>,
    by_key: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    store: RwLock<Store>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self { Self::default() }

    pub async fn len(&self) -> usize { self.store.read().await.orders.len() }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<InsertOutcome, RepositoryError> {
        let mut store = self.store.write().await;
        if let Some(existing) = store.by_key.get(order.idempotency_key()).and_then(|id| store.orders.get(id)) {
            return Ok(InsertOutcome { order: existing.clone(), created: false });
        }
        store.by_key.insert(order.idempotency_key().to_string(), order.id().to_string());
        store.orders.insert(order.id().to_string(), order.clone());
        Ok(InsertOutcome { order: order.clone(), created: true })
    }

    async fn find(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self.store.read().await.orders.get(id).cloned())
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        match store.orders.get_mut(order.id()) {
            Some(slot) => {
                *slot = order.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(order.id().to_string())),
        }
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let store = self.store.read().await;
        let mut orders: Vec<Order> = store.orders.values().filter(|o| o.status() == status).cloned().collect();
        orders.sort_by_key(|o| o.order_date());
        Ok(orders)
    }
}

/// Keeps published events in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<OrderEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self { Self::default() }

    pub async fn events(&self) -> Vec<OrderEvent> { self.events.lock().await.clone() }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

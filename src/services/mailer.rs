use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::domain::aggregates::Order;
use crate::domain::value_objects::Money;

#[derive(Debug, Error)]
#[error("email dispatch failed: {0}")]
pub struct MailerError(pub String);

/// Template payload for the order confirmation email. Wording lives with the dispatcher.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub customer_name: String,
    pub total: Money,
    pub item_count: u32,
    pub awaiting_transfer: bool,
}

impl OrderConfirmation {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            customer_name: order.customer().name.clone(),
            total: order.payment().total().clone(),
            item_count: order.items().iter().fold(0u32, |n, i| n.saturating_add(i.quantity)),
            awaiting_transfer: order.payment().method() == crate::domain::aggregates::PaymentMethod::Eft,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_order_confirmation(&self, to: &str, payload: &OrderConfirmation) -> Result<(), MailerError>;
}

/// Writes the dispatch to the log instead of sending it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_order_confirmation(&self, to: &str, payload: &OrderConfirmation) -> Result<(), MailerError> {
        if to.trim().is_empty() {
            return Err(MailerError("no recipient".into()));
        }
        info!(to, order_id = %payload.order_id, total = %payload.total, "order confirmation email queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::fixtures::order_at;
    use chrono::Utc;

    #[tokio::test]
    async fn log_mailer_requires_recipient() {
        let payload = OrderConfirmation::for_order(&order_at("Antalya", Utc::now()));
        assert_eq!(payload.item_count, 2);
        assert!(!payload.awaiting_transfer);
        assert!(LogMailer.send_order_confirmation("ayse@example.com", &payload).await.is_ok());
        assert!(LogMailer.send_order_confirmation(" ", &payload).await.is_err());
    }
}

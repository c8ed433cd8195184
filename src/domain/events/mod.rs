//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, total: Decimal, guest: bool },
    StatusChanged { order_id: String, from: OrderStatus, to: OrderStatus },
    HeatHoldActivated { order_id: String, temperature: f64, reason: String },
    HeatHoldReleased { order_id: String, temperature: Option<f64>, automatic: bool },
    ShippingCostEstimated { order_id: String, cost: Decimal },
    Delivered { order_id: String, at: DateTime<Utc>, on_time: bool },
}

impl OrderEvent {
    pub fn order_id(&self) -> &str {
        match self {
            Self::Placed { order_id, .. }
            | Self::StatusChanged { order_id, .. }
            | Self::HeatHoldActivated { order_id, .. }
            | Self::HeatHoldReleased { order_id, .. }
            | Self::ShippingCostEstimated { order_id, .. }
            | Self::Delivered { order_id, .. } => order_id,
        }
    }

    /// Subject suffix used when publishing, e.g. `orders.heat_hold_activated`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "orders.placed",
            Self::StatusChanged { .. } => "orders.status_changed",
            Self::HeatHoldActivated { .. } => "orders.heat_hold_activated",
            Self::HeatHoldReleased { .. } => "orders.heat_hold_released",
            Self::ShippingCostEstimated { .. } => "orders.shipping_cost_estimated",
            Self::Delivered { .. } => "orders.delivered",
        }
    }
}

//! Estimated delivery date (EDD).
//!
//! The estimate is derived from the order on every read; the copy stored in
//! `Logistics::estimated_delivery_date` is advisory only.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc, Weekday};
use serde::Serialize;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::shipping::calendar::istanbul;

pub const WEATHER_DELAY_HOURS: i64 = 12;

/// Order cycle time: prep before a parcel can leave.
pub fn cycle_time_hours(status: OrderStatus) -> i64 {
    match status {
        OrderStatus::Pending => 24,
        OrderStatus::Processing | OrderStatus::HeatHold => 48,
        OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled => 0,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeliveryStatus {
    pub emoji: &'static str,
    pub status: String,
    pub color: &'static str,
    pub bg_color: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeliveryPromise {
    pub estimated_delivery_date: DateTime<Utc>,
    pub promised_delivery_date: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub is_perfect_order: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct EddCalculator {
    tz: FixedOffset,
}

impl Default for EddCalculator {
    fn default() -> Self { Self::new(istanbul()) }
}

impl EddCalculator {
    /// `tz` decides which calendar day counts as a weekend.
    pub fn new(tz: FixedOffset) -> Self { Self { tz } }

    pub fn tz(&self) -> FixedOffset { self.tz }

    pub fn estimate(&self, order: &Order) -> DateTime<Utc> {
        let status = order.status();
        let logistics = order.logistics();
        match status {
            OrderStatus::Delivered => {
                if let Some(actual) = logistics.actual_delivery_date {
                    return actual;
                }
            }
            OrderStatus::Cancelled => return order.order_date(),
            _ => {}
        }

        let transit = Duration::hours(order.customer().destination.region.transit_hours());
        let mut eta = order.order_date() + Duration::hours(cycle_time_hours(status));
        match status {
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::HeatHold => eta = eta + transit,
            OrderStatus::Shipped => {
                if let Some(shipped_at) = logistics.shipped_at {
                    eta = shipped_at + transit;
                }
            }
            _ => {}
        }
        if order.weather_alert().is_some_and(|w| w.requires_ice) {
            eta = eta + Duration::hours(WEATHER_DELAY_HOURS);
        }
        self.skip_weekend(eta)
    }

    pub fn delivery_status(&self, order: &Order, now: DateTime<Utc>) -> DeliveryStatus {
        match order.status() {
            OrderStatus::Delivered => {
                return DeliveryStatus { emoji: "✅", status: "Teslim Edildi".into(), color: "#166534", bg_color: "#dcfce7" }
            }
            OrderStatus::Cancelled => {
                return DeliveryStatus { emoji: "❌", status: "İptal Edildi".into(), color: "#991b1b", bg_color: "#fee2e2" }
            }
            _ => {}
        }

        let hours_until = (self.estimate(order) - now).num_seconds() as f64 / 3600.0;
        if hours_until < 24.0 {
            DeliveryStatus { emoji: "🚚", status: "Bugün Teslim".into(), color: "#9a3412", bg_color: "#ffedd5" }
        } else if hours_until < 48.0 {
            DeliveryStatus { emoji: "📦", status: "Yarın Teslim".into(), color: "#1e40af", bg_color: "#dbeafe" }
        } else {
            let days = (hours_until / 24.0).ceil() as i64;
            DeliveryStatus { emoji: "🗓️", status: format!("{} Gün İçinde", days), color: "#3f3f46", bg_color: "#f4f4f5" }
        }
    }

    /// Delivered no later than the promise captured at checkout.
    pub fn is_perfect_order(&self, order: &Order) -> bool {
        let logistics = order.logistics();
        match (order.status(), logistics.actual_delivery_date, logistics.promised_delivery_date) {
            (OrderStatus::Delivered, Some(actual), Some(promised)) => actual <= promised,
            _ => false,
        }
    }

    pub fn promise(&self, order: &Order, now: DateTime<Utc>) -> DeliveryPromise {
        DeliveryPromise {
            estimated_delivery_date: self.estimate(order),
            promised_delivery_date: order.logistics().promised_delivery_date,
            status: self.delivery_status(order, now),
            is_perfect_order: self.is_perfect_order(order),
        }
    }

    fn skip_weekend(&self, eta: DateTime<Utc>) -> DateTime<Utc> {
        let days = match eta.with_timezone(&self.tz).weekday() {
            Weekday::Sat => 2,
            Weekday::Sun => 1,
            _ => 0,
        };
        eta + Duration::days(days)
    }
}

pub fn calculate_estimated_delivery_date(order: &Order) -> DateTime<Utc> { EddCalculator::default().estimate(order) }

pub fn get_delivery_status(order: &Order, now: DateTime<Utc>) -> DeliveryStatus { EddCalculator::default().delivery_status(order, now) }

pub fn is_perfect_order(order: &Order) -> bool { EddCalculator::default().is_perfect_order(order) }

//! Heat-hold controller.
//!
//! Orders bound for a destination at or above the heat-hold threshold are
//! parked in [`OrderStatus::HeatHold`] and released once the destination
//! cools below [`thresholds::SAFE_MAX`]. Every operation reports a
//! [`HeatHoldOutcome`] instead of failing; the batch sweep never aborts on a
//! single bad order.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::domain::aggregates::{Order, OrderError, OrderStatus};
use crate::infrastructure::{publish_all, EventPublisher, OrderRepository, RepositoryError};
use crate::weather::{check_heat_hold_release, check_weather_for_shipping, thresholds, WeatherProvider};

/// Status an order returns to when a hold lifts: the packing stage of processing.
pub const DEFAULT_RELEASE_STATUS: OrderStatus = OrderStatus::Processing;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatHoldDecision {
    pub should_hold: bool,
    pub temperature: f64,
    pub reason: Option<String>,
    pub recommendation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeatHoldOutcome {
    pub success: bool,
    pub message: String,
}

impl HeatHoldOutcome {
    fn ok(message: impl Into<String>) -> Self { Self { success: true, message: message.into() } }
    fn failed(message: impl Into<String>) -> Self { Self { success: false, message: message.into() } }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AutoReleaseResult {
    pub order_id: String,
    pub city: String,
    pub temperature: Option<f64>,
    pub released: bool,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AutoReleaseReport {
    pub checked: usize,
    pub released: usize,
    pub results: Vec<AutoReleaseResult>,
}

#[derive(Debug, Error)]
enum HeatHoldError {
    #[error("order {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct HeatHoldController {
    orders: Arc<dyn OrderRepository>,
    weather: Arc<dyn WeatherProvider>,
    events: Arc<dyn EventPublisher>,
}

impl HeatHoldController {
    pub fn new(orders: Arc<dyn OrderRepository>, weather: Arc<dyn WeatherProvider>, events: Arc<dyn EventPublisher>) -> Self {
        Self { orders, weather, events }
    }

    pub async fn check_heat_hold_required(&self, city: &str) -> HeatHoldDecision {
        let check = check_weather_for_shipping(self.weather.as_ref(), city).await;
        HeatHoldDecision {
            should_hold: check.requires_heat_hold,
            temperature: check.weather.temperature,
            reason: check.heat_hold_reason,
            recommendation: check.recommendation,
        }
    }

    #[instrument(skip(self, reason))]
    pub async fn activate_heat_hold(&self, order_id: &str, reason: &str, target_temp: f64) -> HeatHoldOutcome {
        match self.try_activate(order_id, reason, target_temp).await {
            Ok(()) => {
                info!(order_id, target_temp, "heat hold activated");
                HeatHoldOutcome::ok(format!("Sipariş {} sıcaklık beklemesine alındı.", order_id))
            }
            Err(e) => {
                warn!(order_id, error = %e, "heat hold activation failed");
                HeatHoldOutcome::failed(e.to_string())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn release_heat_hold(&self, order_id: &str, new_status: Option<OrderStatus>) -> HeatHoldOutcome {
        let next = new_status.unwrap_or(DEFAULT_RELEASE_STATUS);
        match self.try_release(order_id, next, None, false).await {
            Ok(_) => {
                info!(order_id, status = %next, "heat hold released");
                HeatHoldOutcome::ok(format!("Sipariş {} serbest bırakıldı.", order_id))
            }
            Err(e) => {
                warn!(order_id, error = %e, "heat hold release failed");
                HeatHoldOutcome::failed(e.to_string())
            }
        }
    }

    /// One pass over every held order with auto-release enabled.
    #[instrument(skip(self))]
    pub async fn process_auto_releases(&self) -> AutoReleaseReport {
        let held = match self.orders.find_by_status(OrderStatus::HeatHold).await {
            Ok(orders) => orders,
            Err(e) => {
                error!(error = %e, "could not load held orders");
                return AutoReleaseReport::default();
            }
        };

        let mut report = AutoReleaseReport::default();
        for order in held.iter().filter(|o| o.logistics().active_heat_hold().is_some_and(|h| h.auto_release)) {
            report.checked += 1;
            let city = order.customer().destination.city.clone();
            let check = check_heat_hold_release(self.weather.as_ref(), &city).await;
            if !check.can_release {
                report.results.push(AutoReleaseResult {
                    order_id: order.id().to_string(),
                    city,
                    temperature: Some(check.current_temp),
                    released: false,
                    message: check.message,
                });
                continue;
            }

            let result = match self.try_release(order.id(), DEFAULT_RELEASE_STATUS, Some(check.current_temp), true).await {
                Ok(_) => {
                    report.released += 1;
                    AutoReleaseResult { order_id: order.id().to_string(), city, temperature: Some(check.current_temp), released: true, message: check.message }
                }
                Err(e) => {
                    warn!(order_id = order.id(), error = %e, "auto release failed, continuing");
                    AutoReleaseResult { order_id: order.id().to_string(), city, temperature: Some(check.current_temp), released: false, message: e.to_string() }
                }
            };
            report.results.push(result);
        }
        info!(checked = report.checked, released = report.released, "heat hold sweep finished");
        report
    }

    /// Runs [`Self::process_auto_releases`] every `every`; the first pass happens immediately.
    pub fn spawn_auto_release_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.process_auto_releases().await;
            }
        })
    }

    async fn load(&self, order_id: &str) -> Result<Order, HeatHoldError> {
        self.orders.find(order_id).await?.ok_or_else(|| HeatHoldError::NotFound(order_id.to_string()))
    }

    async fn try_activate(&self, order_id: &str, reason: &str, target_temp: f64) -> Result<(), HeatHoldError> {
        let mut order = self.load(order_id).await?;
        order.activate_heat_hold(reason, target_temp, thresholds::SAFE_MAX, Utc::now())?;
        self.orders.save(&order).await?;
        publish_all(self.events.as_ref(), order.take_events()).await;
        Ok(())
    }

    async fn try_release(&self, order_id: &str, next: OrderStatus, temp: Option<f64>, automatic: bool) -> Result<Order, HeatHoldError> {
        let mut order = self.load(order_id).await?;
        order.release_heat_hold(next, temp, automatic, Utc::now())?;
        self.orders.save(&order).await?;
        publish_all(self.events.as_ref(), order.take_events()).await;
        Ok(order)
    }
}

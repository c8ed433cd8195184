//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::OrderEvent;
use crate::checkout::form::InvoiceProfile;
use crate::domain::value_objects::{Dimensions, Money, MoneyError};
use crate::shipping::cold_pack::ColdPackNeeds;
use crate::shipping::metrics::ShipmentMetrics;
use crate::shipping::region::ShippingRegion;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: String,
    idempotency_key: String,
    order_date: DateTime<Utc>,
    status: OrderStatus,
    customer: CustomerSnapshot,
    items: Vec<LineItem>,
    payment: PaymentSummary,
    #[serde(default)]
    logistics: Logistics,
    weather_alert: Option<WeatherAlert>,
    cold_pack: Option<ColdPackNeeds>,
    shipment: Option<ShipmentMetrics>,
    #[serde(default)]
    timeline: Vec<TimelineEntry>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<OrderEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    HeatHold,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::HeatHold => "heat_hold",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Processing | HeatHold) => true,
            (Processing, Shipped | HeatHold) => true,
            (HeatHold, Pending | Processing) => true,
            (Shipped, Delivered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" => Ok(Self::Pending),
            "processing" | "ready_for_packing" => Ok(Self::Processing),
            "heat_hold" => Ok(Self::HeatHold),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub title: String,
    pub price: Money,
    pub quantity: u32,
    pub image: Option<String>,
    pub weight_grams: Option<u32>,
    pub dimensions: Option<Dimensions>,
}

impl LineItem {
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.price.multiply(self.quantity) }
}

/// Destination resolved once from the buyer's city selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub city: String,
    pub district: String,
    pub province_code: Option<u8>,
    pub region: ShippingRegion,
}

impl Destination {
    pub fn resolve(city: impl Into<String>, district: impl Into<String>) -> Self {
        let city = city.into();
        let province = crate::shipping::region::lookup_province(&city);
        Self {
            district: district.into(),
            province_code: province.map(|p| p.code),
            region: province.map(|p| p.region).unwrap_or(ShippingRegion::National),
            city,
        }
    }
}

/// Denormalized copy of the buyer at order time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub destination: Destination,
    /// Billing identity as entered at checkout, already normalized.
    #[serde(default)]
    pub invoice: InvoiceProfile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Card, Eft }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, AwaitingTransfer, Paid, Refunded }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    method: PaymentMethod,
    subtotal: Money,
    shipping_cost: Money,
    discount: Option<Money>,
    total: Money,
    status: PaymentStatus,
}

impl PaymentSummary {
    /// `total` is always `subtotal + shipping_cost - discount`.
    pub fn new(method: PaymentMethod, subtotal: Money, shipping_cost: Money, discount: Option<Money>) -> Result<Self, MoneyError> {
        let mut total = subtotal.add(&shipping_cost)?;
        if let Some(discount) = &discount { total = total.subtract(discount)?; }
        let status = match method { PaymentMethod::Card => PaymentStatus::Paid, PaymentMethod::Eft => PaymentStatus::AwaitingTransfer };
        Ok(Self { method, subtotal, shipping_cost, discount, total, status })
    }

    pub fn method(&self) -> PaymentMethod { self.method }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn shipping_cost(&self) -> &Money { &self.shipping_cost }
    pub fn discount(&self) -> Option<&Money> { self.discount.as_ref() }
    pub fn total(&self) -> &Money { &self.total }
    pub fn status(&self) -> PaymentStatus { self.status }
}

/// One heat-hold cycle. At most one record per order is active at a time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatHoldInfo {
    pub is_active: bool,
    pub reason: String,
    pub activated_at: DateTime<Utc>,
    pub target_temp: f64,
    pub release_temp: f64,
    pub auto_release: bool,
    pub released_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub estimated_shipping_cost: Money,
    pub carrier: String,
    pub estimated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Logistics {
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    /// Advisory copy only; the EDD is recomputed on every read.
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    /// Promise snapshot taken when the order was placed. Never recomputed.
    pub promised_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub heat_holds: Vec<HeatHoldInfo>,
    pub cost_analysis: Option<CostAnalysis>,
}

impl Logistics {
    /// Latest hold cycle, active or not.
    pub fn heat_hold(&self) -> Option<&HeatHoldInfo> { self.heat_holds.last() }

    pub fn active_heat_hold(&self) -> Option<&HeatHoldInfo> { self.heat_holds.iter().rev().find(|h| h.is_active) }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert { pub temp: f64, pub requires_ice: bool }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub status: OrderStatus,
    pub note: String,
}

/// Everything the checkout knows when it places an order.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub idempotency_key: String,
    pub placed_at: DateTime<Utc>,
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub payment: PaymentSummary,
    pub weather_alert: Option<WeatherAlert>,
    pub cold_pack: Option<ColdPackNeeds>,
    pub shipment: Option<ShipmentMetrics>,
}

impl Order {
    pub fn place(new: NewOrder) -> Result<Self, OrderError> {
        if new.items.is_empty() { return Err(OrderError::NoItems); }
        let id = Uuid::now_v7().to_string();
        let total = new.payment.total().amount();
        let guest = new.customer.user_id.is_none();
        let mut order = Self {
            id: id.clone(),
            idempotency_key: new.idempotency_key,
            order_date: new.placed_at,
            status: OrderStatus::Pending,
            customer: new.customer,
            items: new.items,
            payment: new.payment,
            logistics: Logistics::default(),
            weather_alert: new.weather_alert,
            cold_pack: new.cold_pack,
            shipment: new.shipment,
            timeline: vec![],
            updated_at: new.placed_at,
            events: vec![],
        };
        order.append_timeline(new.placed_at, "Sipariş alındı");
        order.raise_event(OrderEvent::Placed { order_id: id, total, guest });
        Ok(order)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn idempotency_key(&self) -> &str { &self.idempotency_key }
    pub fn order_date(&self) -> DateTime<Utc> { self.order_date }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn customer(&self) -> &CustomerSnapshot { &self.customer }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn payment(&self) -> &PaymentSummary { &self.payment }
    pub fn logistics(&self) -> &Logistics { &self.logistics }
    pub fn weather_alert(&self) -> Option<&WeatherAlert> { self.weather_alert.as_ref() }
    pub fn cold_pack(&self) -> Option<&ColdPackNeeds> { self.cold_pack.as_ref() }
    pub fn shipment(&self) -> Option<&ShipmentMetrics> { self.shipment.as_ref() }
    pub fn timeline(&self) -> &[TimelineEntry] { &self.timeline }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_guest(&self) -> bool { self.customer.user_id.is_none() }

    pub fn transition_to(&mut self, next: OrderStatus, at: DateTime<Utc>) -> Result<(), OrderError> {
        if next == OrderStatus::HeatHold { return Err(OrderError::InvalidTransition { from: self.status, to: next }); }
        self.apply_transition(next, at)?;
        match next {
            OrderStatus::Shipped => { self.logistics.shipped_at.get_or_insert(at); }
            OrderStatus::Delivered => {
                self.logistics.actual_delivery_date = Some(at);
                let on_time = self.logistics.promised_delivery_date.map(|p| at <= p).unwrap_or(false);
                self.raise_event(OrderEvent::Delivered { order_id: self.id.clone(), at, on_time });
            }
            _ => {}
        }
        self.append_timeline(at, &format!("Durum güncellendi: {}", next));
        Ok(())
    }

    pub fn ship(&mut self, tracking_number: impl Into<String>, carrier: impl Into<String>, at: DateTime<Utc>) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Shipped, at)?;
        self.logistics.tracking_number = Some(tracking_number.into());
        self.logistics.carrier = Some(carrier.into());
        Ok(())
    }

    pub fn deliver(&mut self, at: DateTime<Utc>) -> Result<(), OrderError> { self.transition_to(OrderStatus::Delivered, at) }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), OrderError> { self.transition_to(OrderStatus::Cancelled, at) }

    pub fn activate_heat_hold(&mut self, reason: impl Into<String>, target_temp: f64, release_temp: f64, at: DateTime<Utc>) -> Result<(), OrderError> {
        if self.logistics.active_heat_hold().is_some() { return Err(OrderError::AlreadyHeld); }
        self.apply_transition(OrderStatus::HeatHold, at)?;
        let reason = reason.into();
        self.logistics.heat_holds.push(HeatHoldInfo {
            is_active: true,
            reason: reason.clone(),
            activated_at: at,
            target_temp,
            release_temp,
            auto_release: true,
            released_at: None,
        });
        self.append_timeline(at, &format!("Sıcaklık beklemesi: {}", reason));
        self.raise_event(OrderEvent::HeatHoldActivated { order_id: self.id.clone(), temperature: target_temp, reason });
        Ok(())
    }

    pub fn release_heat_hold(&mut self, next: OrderStatus, current_temp: Option<f64>, automatic: bool, at: DateTime<Utc>) -> Result<(), OrderError> {
        if self.status != OrderStatus::HeatHold || self.logistics.active_heat_hold().is_none() { return Err(OrderError::NotHeld); }
        self.apply_transition(next, at)?;
        let note = match current_temp {
            Some(t) => format!("Sıcaklık beklemesi kaldırıldı ({}°C)", t),
            None => "Sıcaklık beklemesi kaldırıldı".to_string(),
        };
        self.append_timeline(at, &note);
        self.raise_event(OrderEvent::HeatHoldReleased { order_id: self.id.clone(), temperature: current_temp, automatic });
        Ok(())
    }

    pub fn set_weather_alert(&mut self, alert: WeatherAlert) { self.weather_alert = Some(alert); self.updated_at = Utc::now(); }

    pub fn set_promised_delivery_date(&mut self, promised: DateTime<Utc>) {
        self.logistics.promised_delivery_date.get_or_insert(promised);
        self.logistics.estimated_delivery_date = Some(promised);
    }

    pub fn refresh_estimated_delivery_date(&mut self, estimate: DateTime<Utc>) { self.logistics.estimated_delivery_date = Some(estimate); }

    pub fn record_cost_analysis(&mut self, analysis: CostAnalysis) {
        let cost = analysis.estimated_shipping_cost.amount();
        self.logistics.cost_analysis = Some(analysis);
        self.raise_event(OrderEvent::ShippingCostEstimated { order_id: self.id.clone(), cost });
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }

    fn apply_transition(&mut self, next: OrderStatus, at: DateTime<Utc>) -> Result<(), OrderError> {
        let from = self.status;
        if !from.can_transition_to(next) { return Err(OrderError::InvalidTransition { from, to: next }); }
        // Any exit from HeatHold closes the active hold record.
        if from == OrderStatus::HeatHold {
            if let Some(hold) = self.logistics.heat_holds.iter_mut().rev().find(|h| h.is_active) {
                hold.is_active = false;
                hold.released_at = Some(at);
            }
        }
        self.status = next;
        self.updated_at = at;
        self.raise_event(OrderEvent::StatusChanged { order_id: self.id.clone(), from, to: next });
        Ok(())
    }

    fn append_timeline(&mut self, at: DateTime<Utc>, note: &str) {
        self.timeline.push(TimelineEntry { at, status: self.status, note: note.to_string() });
    }

    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order is already on heat hold")]
    AlreadyHeld,
    #[error("Order is not on heat hold")]
    NotHeld,
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

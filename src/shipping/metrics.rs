//! Parcel weight and desi for carrier quotes.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::LineItem;

pub const DEFAULT_ITEM_WEIGHT_GRAMS: u32 = 200;
pub const DEFAULT_ITEM_DESI: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipmentMetrics {
    pub total_weight_kg: f64,
    /// Billable desi: the larger of weight and volume, rounded up, never below 1.
    pub desi: u32,
}

impl ShipmentMetrics {
    pub fn from_items(items: &[LineItem]) -> Self {
        let grams: u64 = items
            .iter()
            .map(|i| u64::from(i.weight_grams.unwrap_or(DEFAULT_ITEM_WEIGHT_GRAMS)) * u64::from(i.quantity))
            .sum();
        let volume_desi: f64 = items
            .iter()
            .map(|i| i.dimensions.map(|d| d.desi()).unwrap_or(DEFAULT_ITEM_DESI) * f64::from(i.quantity))
            .sum();
        let total_weight_kg = grams as f64 / 1000.0;
        let desi = total_weight_kg.max(volume_desi).ceil().max(1.0) as u32;
        Self { total_weight_kg, desi }
    }
}

//! Refrigerant sizing for warm-weather shipments.

use chrono::{DateTime, Datelike, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::weather::thresholds;

/// kg of gel pack per kg of chocolate, May through September.
pub const RATIO_SUMMER: f64 = 1.0;
pub const RATIO_DEFAULT: f64 = 0.5;
pub const MIN_QUANTITY_KG: f64 = 0.5;
pub const MAX_QUANTITY_KG: f64 = 3.0;
/// Lira per kg of gel pack.
pub const UNIT_COST: i64 = 15;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColdPackNeeds {
    pub required: bool,
    /// kg, one decimal place.
    pub quantity: f64,
    pub reason: String,
    pub is_summer_protocol: bool,
    pub estimated_cost: Option<Decimal>,
}

pub fn is_summer_season<Tz: TimeZone>(date: &DateTime<Tz>) -> bool { (5..=9).contains(&date.month()) }

pub fn calculate_cold_pack_needs<Tz: TimeZone>(temperature: f64, order_weight_kg: f64, date: &DateTime<Tz>) -> ColdPackNeeds {
    let is_summer_protocol = is_summer_season(date);
    if temperature < thresholds::COLD_PACK_REQUIRED {
        return ColdPackNeeds {
            required: false,
            quantity: 0.0,
            reason: format!("{}°C: soğutucu gerekmiyor", temperature),
            is_summer_protocol,
            estimated_cost: None,
        };
    }

    let ratio = if is_summer_protocol { RATIO_SUMMER } else { RATIO_DEFAULT };
    let tenths = (order_weight_kg * ratio).clamp(MIN_QUANTITY_KG, MAX_QUANTITY_KG) * 10.0;
    let tenths = tenths.round() as i64;
    let quantity = tenths as f64 / 10.0;
    let protocol = if is_summer_protocol { "yaz protokolü" } else { "standart protokol" };

    ColdPackNeeds {
        required: true,
        quantity,
        reason: format!("{}°C: {} kg soğutucu jel ({})", temperature, quantity, protocol),
        is_summer_protocol,
        estimated_cost: Some(Decimal::new(tenths * UNIT_COST, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipping::calendar::istanbul;
    use chrono::{DateTime, FixedOffset};

    fn july() -> DateTime<FixedOffset> { istanbul().with_ymd_and_hms(2024, 7, 15, 10, 0, 0).unwrap() }
    fn january() -> DateTime<FixedOffset> { istanbul().with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap() }

    #[test]
    fn cool_weather_needs_nothing() {
        let needs = calculate_cold_pack_needs(19.9, 2.0, &july());
        assert!(!needs.required);
        assert_eq!(needs.quantity, 0.0);
        assert!(needs.estimated_cost.is_none());
    }

    #[test]
    fn summer_doubles_ratio() {
        assert_eq!(calculate_cold_pack_needs(22.0, 1.2, &july()).quantity, 1.2);
        assert_eq!(calculate_cold_pack_needs(22.0, 1.2, &january()).quantity, 0.6);
    }

    #[test]
    fn quantity_is_clamped() {
        assert_eq!(calculate_cold_pack_needs(25.0, 0.1, &july()).quantity, 0.5);
        assert_eq!(calculate_cold_pack_needs(25.0, 10.0, &july()).quantity, 3.0);
    }

    #[test]
    fn cost_is_fifteen_per_kg() {
        let needs = calculate_cold_pack_needs(31.0, 1.25, &july());
        assert_eq!(needs.quantity, 1.3);
        assert_eq!(needs.estimated_cost, Some(Decimal::new(195, 1)));
        assert!(needs.is_summer_protocol);
    }

    #[test]
    fn season_boundaries() {
        let may = istanbul().with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let october = istanbul().with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        assert!(is_summer_season(&may));
        assert!(!is_summer_season(&october));
    }
}

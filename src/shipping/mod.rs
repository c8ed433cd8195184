//! Shipping rules: dispatch calendar, transit regions, parcel metrics,
//! cold-pack sizing and the delivery promise.
pub mod calendar;
pub mod cold_pack;
pub mod edd;
pub mod metrics;
pub mod region;

pub use calendar::{calculate_blackout_delay, is_blackout_day, next_shipping_date, shipping_window_info, BlackoutDelay, ShippingWindowInfo};
pub use cold_pack::{calculate_cold_pack_needs, ColdPackNeeds};
pub use edd::{DeliveryPromise, DeliveryStatus, EddCalculator};
pub use metrics::ShipmentMetrics;
pub use region::{classify_region, ShippingRegion};

//! Aggregates module
pub mod order;
pub mod cart;

pub use order::{
    CostAnalysis, CustomerSnapshot, Destination, HeatHoldInfo, LineItem, Logistics, NewOrder, Order, OrderError,
    OrderStatus, PaymentMethod, PaymentStatus, PaymentSummary, TimelineEntry, WeatherAlert,
};
pub use cart::{Cart, CartError, CartItem};

//! Cocoa Atelier storefront core
//!
//! Shipping and checkout rules for a chocolate shop that ships heat-sensitive goods.
//!
//! ## Features
//! - Dispatch calendar (no shipping Friday to Sunday)
//! - Destination weather checks with a deterministic fallback
//! - Heat hold with automatic release once the destination cools
//! - Cold-pack sizing
//! - Estimated delivery date and delivery status labels
//! - Two-step checkout with pricing, drafts and idempotent order placement

use thiserror::Error;

pub mod api;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod heat_hold;
pub mod infrastructure;
pub mod logging;
pub mod services;
pub mod shipping;
pub mod weather;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error(transparent)]
    Order(#[from] domain::aggregates::OrderError),

    #[error(transparent)]
    Checkout(#[from] checkout::CheckoutError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] infrastructure::RepositoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Publish(#[from] infrastructure::PublishError),

    #[error("Weather service error: {0}")]
    Weather(#[from] weather::WeatherError),

    #[error("Carrier client error: {0}")]
    Carrier(#[from] services::CarrierError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

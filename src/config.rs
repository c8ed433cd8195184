//! Environment configuration. A `.env` file is honoured when present.

use chrono::{Duration, FixedOffset};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::checkout::{CheckoutSettings, PricingPolicy};
use crate::domain::value_objects::DEFAULT_CURRENCY;
use crate::weather::client::DEFAULT_WEATHER_URL;

const DEFAULT_PORT: u16 = 8083;
const DEFAULT_SWEEP_MINUTES: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// In-memory storage when unset.
    pub database_url: Option<String>,
    /// Events are only logged when unset.
    pub nats_url: Option<String>,
    pub weather_api_key: Option<String>,
    pub weather_api_url: String,
    /// Cost estimates are skipped when unset.
    pub carrier_api_url: Option<String>,
    pub carrier_api_key: Option<String>,
    pub shop_utc_offset: FixedOffset,
    pub heat_hold_sweep_every: std::time::Duration,
    pub checkout: CheckoutSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = CheckoutSettings::default();
        let pricing = PricingPolicy {
            currency: DEFAULT_CURRENCY.to_string(),
            free_shipping_limit: parse(&get, "FREE_SHIPPING_LIMIT")?.unwrap_or(defaults.pricing.free_shipping_limit),
            default_shipping_cost: parse(&get, "DEFAULT_SHIPPING_COST")?.unwrap_or(defaults.pricing.default_shipping_cost),
            bank_transfer_discount_enabled: parse(&get, "BANK_TRANSFER_DISCOUNT_ENABLED")?
                .unwrap_or(defaults.pricing.bank_transfer_discount_enabled),
            bank_transfer_discount_percent: parse::<Decimal>(&get, "BANK_TRANSFER_DISCOUNT_PERCENT")?
                .unwrap_or(defaults.pricing.bank_transfer_discount_percent),
        };
        let deadline_hours: i64 = parse(&get, "PAYMENT_DEADLINE_HOURS")?.unwrap_or(defaults.payment_deadline.num_hours());
        let checkout = CheckoutSettings {
            pricing,
            payment_deadline: Duration::hours(deadline_hours),
            origin_city_code: get("ORIGIN_CITY_CODE").unwrap_or(defaults.origin_city_code),
        };

        let offset_hours: i32 = parse(&get, "SHOP_UTC_OFFSET_HOURS")?.unwrap_or(3);
        let shop_utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| ConfigError::Invalid { key: "SHOP_UTC_OFFSET_HOURS", value: offset_hours.to_string() })?;
        let sweep_minutes: u64 = parse(&get, "HEAT_HOLD_SWEEP_MINUTES")?.unwrap_or(DEFAULT_SWEEP_MINUTES);
        if sweep_minutes == 0 {
            return Err(ConfigError::Invalid { key: "HEAT_HOLD_SWEEP_MINUTES", value: "0".into() });
        }

        Ok(Self {
            port: parse(&get, "PORT")?.unwrap_or(DEFAULT_PORT),
            database_url: get("DATABASE_URL"),
            nats_url: get("NATS_URL"),
            weather_api_key: get("WEATHER_API_KEY"),
            weather_api_url: get("WEATHER_API_URL").unwrap_or_else(|| DEFAULT_WEATHER_URL.to_string()),
            carrier_api_url: get("CARRIER_API_URL"),
            carrier_api_key: get("CARRIER_API_KEY"),
            shop_utc_offset,
            heat_hold_sweep_every: std::time::Duration::from_secs(sweep_minutes * 60),
            checkout,
        })
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

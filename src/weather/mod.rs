//! Destination weather and the temperature gates applied before dispatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod client;

pub use client::{WeatherError, WeatherService};

/// Fixed shipping thresholds in °C.
pub mod thresholds {
    /// Shipment waits at or above this.
    pub const HEAT_HOLD: f64 = 30.0;
    /// Gel packs go in at or above this.
    pub const COLD_PACK_REQUIRED: f64 = 20.0;
    /// A held shipment is released strictly below this.
    pub const SAFE_MAX: f64 = 25.0;
    pub const IDEAL_MIN: f64 = 12.0;
    pub const IDEAL_MAX: f64 = 20.0;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeatherSource {
    Live,
    /// Provider unavailable; the reading is the deterministic stand-in.
    Fallback { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub city: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub condition: String,
    pub wind_speed: f64,
    pub timestamp: DateTime<Utc>,
    pub source: WeatherSource,
}

impl WeatherData {
    pub fn is_fallback(&self) -> bool { matches!(self.source, WeatherSource::Fallback { .. }) }

    pub fn is_ideal(&self) -> bool { (thresholds::IDEAL_MIN..=thresholds::IDEAL_MAX).contains(&self.temperature) }
}

/// Deterministic reading used whenever the provider cannot answer.
pub fn fallback_weather(city: &str, reason: impl Into<String>) -> WeatherData {
    let len = city.chars().count() as f64;
    let temperature = (22.0 + 10.0 * len.sin()).round();
    WeatherData {
        city: city.to_string(),
        temperature,
        feels_like: temperature,
        humidity: 50.0,
        condition: "Bilinmiyor".to_string(),
        wind_speed: 0.0,
        timestamp: Utc::now(),
        source: WeatherSource::Fallback { reason: reason.into() },
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Never fails: providers degrade to [`fallback_weather`].
    async fn weather_by_city(&self, city: &str) -> WeatherData;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShippingWeatherCheck {
    pub weather: WeatherData,
    pub requires_heat_hold: bool,
    pub requires_cold_pack: bool,
    pub heat_hold_reason: Option<String>,
    pub recommendation: String,
}

impl ShippingWeatherCheck {
    pub fn from_weather(weather: WeatherData) -> Self {
        let t = weather.temperature;
        let requires_heat_hold = t >= thresholds::HEAT_HOLD;
        let requires_cold_pack = t >= thresholds::COLD_PACK_REQUIRED;
        let heat_hold_reason = requires_heat_hold
            .then(|| format!("{} için sıcaklık {}°C; erime riski nedeniyle gönderi bekletilecek", weather.city, t));
        let recommendation = if requires_heat_hold {
            format!("Sıcaklık {}°C altına düşene kadar gönderiyi bekletin.", thresholds::SAFE_MAX)
        } else if requires_cold_pack {
            "Soğutucu jel ve yalıtımlı kutu ile gönderin.".to_string()
        } else {
            "Hava koşulları gönderim için uygun.".to_string()
        };
        Self { weather, requires_heat_hold, requires_cold_pack, heat_hold_reason, recommendation }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatReleaseCheck {
    pub can_release: bool,
    pub current_temp: f64,
    pub message: String,
    pub fallback: bool,
}

impl HeatReleaseCheck {
    pub fn from_weather(weather: &WeatherData) -> Self {
        let t = weather.temperature;
        let can_release = t < thresholds::SAFE_MAX;
        let message = if can_release {
            format!("{}°C: gönderim serbest bırakılabilir.", t)
        } else {
            format!("{}°C: sıcaklık hâlâ {}°C ve üzerinde, bekleme sürüyor.", t, thresholds::SAFE_MAX)
        };
        Self { can_release, current_temp: t, message, fallback: weather.is_fallback() }
    }
}

pub async fn check_weather_for_shipping(provider: &dyn WeatherProvider, city: &str) -> ShippingWeatherCheck {
    ShippingWeatherCheck::from_weather(provider.weather_by_city(city).await)
}

pub async fn check_heat_hold_release(provider: &dyn WeatherProvider, city: &str) -> HeatReleaseCheck {
    HeatReleaseCheck::from_weather(&provider.weather_by_city(city).await)
}

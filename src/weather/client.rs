use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{fallback_weather, WeatherData, WeatherProvider, WeatherSource};
use crate::shipping::region::normalize;

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather API key is not configured")]
    MissingApiKey,
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather API returned status {0}")]
    Status(u16),
    #[error("weather response had no readings")]
    EmptyResponse,
}

/// Coordinates for the larger cities; anything else is looked up by name.
static CITY_COORDINATES: Lazy<HashMap<String, (f64, f64)>> = Lazy::new(|| {
    [
        ("İstanbul", 41.0082, 28.9784),
        ("Ankara", 39.9334, 32.8597),
        ("İzmir", 38.4237, 27.1428),
        ("Antalya", 36.8969, 30.7133),
        ("Bursa", 40.1826, 29.0665),
        ("Adana", 37.0000, 35.3213),
        ("Konya", 37.8746, 32.4932),
        ("Gaziantep", 37.0662, 37.3833),
        ("Mersin", 36.8121, 34.6415),
        ("Kayseri", 38.7312, 35.4787),
        ("Eskişehir", 39.7767, 30.5206),
        ("Diyarbakır", 37.9144, 40.2306),
        ("Samsun", 41.2928, 36.3313),
        ("Denizli", 37.7765, 29.0864),
        ("Şanlıurfa", 37.1591, 38.7969),
        ("Muğla", 37.2153, 28.3636),
        ("Trabzon", 41.0027, 39.7168),
        ("Hatay", 36.4018, 36.3498),
        ("Van", 38.4891, 43.4089),
        ("Erzurum", 39.9055, 41.2658),
    ]
    .into_iter()
    .map(|(name, lat, lon)| (normalize(name), (lat, lon)))
    .collect()
});

#[derive(Debug, Deserialize)]
struct ApiResponse {
    main: ApiMain,
    #[serde(default)]
    weather: Vec<ApiCondition>,
    #[serde(default)]
    wind: Option<ApiWind>,
}

#[derive(Debug, Deserialize)]
struct ApiMain { temp: f64, feels_like: f64, humidity: f64 }

#[derive(Debug, Deserialize)]
struct ApiCondition { description: String }

#[derive(Debug, Deserialize)]
struct ApiWind { speed: f64 }

/// OpenWeather-compatible client. Construct once and share.
#[derive(Clone)]
pub struct WeatherService {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherService {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, api_key: api_key.filter(|k| !k.trim().is_empty()), base_url: base_url.into() })
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, city: &str) -> Result<WeatherData, WeatherError> {
        let key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let mut query: Vec<(&str, String)> = vec![
            ("appid", key.to_string()),
            ("units", "metric".to_string()),
            ("lang", "tr".to_string()),
        ];
        match CITY_COORDINATES.get(&normalize(city)) {
            Some((lat, lon)) => {
                query.push(("lat", lat.to_string()));
                query.push(("lon", lon.to_string()));
            }
            None => query.push(("q", format!("{},TR", city.trim()))),
        }

        let response = self.client.get(&self.base_url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.as_u16()));
        }
        let body: ApiResponse = response.json().await?;
        let condition = body.weather.into_iter().next().map(|c| c.description).ok_or(WeatherError::EmptyResponse)?;

        Ok(WeatherData {
            city: city.to_string(),
            temperature: body.main.temp,
            feels_like: body.main.feels_like,
            humidity: body.main.humidity,
            condition,
            wind_speed: body.wind.map(|w| w.speed).unwrap_or_default(),
            timestamp: Utc::now(),
            source: WeatherSource::Live,
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherService {
    async fn weather_by_city(&self, city: &str) -> WeatherData {
        match self.fetch(city).await {
            Ok(weather) => {
                debug!(city, temperature = weather.temperature, weather_source = "live", "weather reading");
                weather
            }
            Err(e) => {
                let fallback = fallback_weather(city, e.to_string());
                warn!(city, temperature = fallback.temperature, weather_source = "fallback", error = %e, "weather provider unavailable, using fallback reading");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body(temp: f64) -> serde_json::Value {
        json!({
            "main": { "temp": temp, "feels_like": temp + 1.5, "humidity": 40 },
            "weather": [{ "description": "açık" }],
            "wind": { "speed": 3.2 },
            "name": "Antalya"
        })
    }

    #[tokio::test]
    async fn uses_cached_coordinates_for_known_cities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "36.8969"))
            .and(query_param("appid", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(33.4)))
            .mount(&server)
            .await;

        let service = WeatherService::new(Some("k".into()), format!("{}/weather", server.uri())).unwrap();
        let weather = service.weather_by_city("antalya").await;
        assert_eq!(weather.temperature, 33.4);
        assert_eq!(weather.source, WeatherSource::Live);
        assert_eq!(weather.wind_speed, 3.2);
    }

    #[tokio::test]
    async fn unknown_cities_query_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Bodrum,TR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(27.0)))
            .mount(&server)
            .await;

        let service = WeatherService::new(Some("k".into()), server.uri()).unwrap();
        assert_eq!(service.fetch("Bodrum").await.unwrap().temperature, 27.0);
    }

    #[tokio::test]
    async fn server_error_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let service = WeatherService::new(Some("k".into()), server.uri()).unwrap();
        assert!(matches!(service.fetch("Ankara").await, Err(WeatherError::Status(503))));
        let weather = service.weather_by_city("Ankara").await;
        assert!(weather.is_fallback());
        assert_eq!(weather.temperature, 19.0);
    }

    #[tokio::test]
    async fn missing_key_falls_back_without_network() {
        let service = WeatherService::new(None, "http://127.0.0.1:9").unwrap();
        let weather = service.weather_by_city("İstanbul").await;
        assert_eq!(weather.temperature, 32.0);
        match weather.source {
            WeatherSource::Fallback { reason } => assert!(reason.contains("API key")),
            other => panic!("unexpected source {other:?}"),
        }
    }
}

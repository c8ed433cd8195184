use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("carrier request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("carrier returned status {0}")]
    Status(u16),
    #[error("no carrier endpoint configured")]
    NotConfigured,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CarrierQuoteRequest {
    pub origin_city_code: String,
    /// Plate code when the province is known, the raw city name otherwise.
    pub destination_city_code: String,
    pub destination_district: String,
    pub address: String,
    pub weight_kg: f64,
    pub desi: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CarrierQuote {
    pub carrier: String,
    pub cost: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String { crate::domain::value_objects::DEFAULT_CURRENCY.to_string() }

#[async_trait]
pub trait CarrierClient: Send + Sync {
    async fn estimate(&self, request: &CarrierQuoteRequest) -> Result<CarrierQuote, CarrierError>;
}

pub struct HttpCarrierClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCarrierClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, CarrierError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string(), api_key })
    }
}

#[async_trait]
impl CarrierClient for HttpCarrierClient {
    async fn estimate(&self, request: &CarrierQuoteRequest) -> Result<CarrierQuote, CarrierError> {
        let mut call = self.http.post(format!("{}/shipping/estimate", self.base_url)).json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await?;
        if !response.status().is_success() {
            return Err(CarrierError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Stands in when no carrier endpoint is configured; every estimate is skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredCarrier;

#[async_trait]
impl CarrierClient for UnconfiguredCarrier {
    async fn estimate(&self, _request: &CarrierQuoteRequest) -> Result<CarrierQuote, CarrierError> { Err(CarrierError::NotConfigured) }
}

use axum::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One hour of wholesale price data as published by the dataset API.
/// Prices are per MWh.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub(crate) struct RawHourlyPrice {
    #[serde(rename = "HourUTC")]
    pub(crate) hour_utc: String,
    #[serde(rename = "HourDK")]
    pub(crate) hour_dk: String,
    #[serde(rename = "PriceArea")]
    pub(crate) price_area: String,
    #[serde(rename = "SpotPriceDKK")]
    pub(crate) spot_price_dkk: f64,
    #[serde(rename = "SpotPriceEUR")]
    pub(crate) spot_price_eur: f64,
}

/// A consumer price starting at a certain moment in local time.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct FrontendHourlyPrice {
    pub(crate) start_time: String,
    pub(crate) price: String,
}

#[derive(Serialize, Debug, Clone)]
pub(crate) struct FrontendResponse {
    pub(crate) spot_prices: Vec<FrontendHourlyPrice>,
}

#[async_trait]
pub(crate) trait SpotPriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_prices(&self) -> Result<Vec<RawHourlyPrice>, ElectricityProviderError>;
}

#[derive(Debug, Error)]
pub enum ElectricityProviderError {
    #[error("failed to fetch prices: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("unexpected price data envelope: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid dataset url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

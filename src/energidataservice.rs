use std::time::Duration;

use axum::async_trait;
use reqwest::Client;
use serde_derive::Deserialize;
use tracing::{info, instrument};
use url::Url;

use crate::domain::{ElectricityProviderError, RawHourlyPrice, SpotPriceProvider};

/// Spot prices from the Energi Data Service "Elspotprices" dataset.
#[derive(Clone, Debug)]
pub(crate) struct Energidataservice {
    client: Client,
    request_url: Url,
}

impl Energidataservice {
    pub(crate) fn new(
        dataset_url: &str,
        price_area: &str,
        limit: u32,
        timeout: Duration,
    ) -> Result<Self, ElectricityProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        let request_url = Url::parse_with_params(
            dataset_url,
            &[
                ("limit", limit.to_string()),
                ("filter", format!(r#"{{"PriceArea":"{}"}}"#, price_area)),
            ],
        )?;

        Ok(Self {
            client,
            request_url,
        })
    }
}

#[async_trait]
impl SpotPriceProvider for Energidataservice {
    fn name(&self) -> &'static str {
        "energidataservice"
    }

    #[instrument(skip(self), fields(url = %self.request_url))]
    async fn fetch_prices(&self) -> Result<Vec<RawHourlyPrice>, ElectricityProviderError> {
        info!("Fetching prices from {}", self.name());

        let body = self
            .client
            .get(self.request_url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let prices = parse_prices_json(&body)?;

        info!("Fetched {} prices from {}", prices.len(), self.name());

        Ok(prices)
    }
}

fn parse_prices_json(json: &str) -> Result<Vec<RawHourlyPrice>, serde_json::Error> {
    serde_json::from_str::<PriceDataResponse>(json).map(|response| response.records)
}

#[derive(Deserialize, Debug)]
#[allow(dead_code)]
struct PriceDataResponse {
    total: i64,
    filters: String,
    limit: i64,
    dataset: String,
    records: Vec<RawHourlyPrice>,
}

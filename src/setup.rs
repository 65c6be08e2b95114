use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tracing::debug;

use crate::{
    config::Config,
    domain::{ElectricityProviderError, SpotPriceProvider},
    energidataservice::Energidataservice,
    tariff::{TariffSchedule, DEFAULT_TARIFFS},
};

/// Setup the app state that is given to every route handler.
/// Contains the spot price provider, the tariffs applied on top of it, the
/// timezone prices are presented in and how long a request may take.
pub(crate) fn setup_app_state(config: &Config) -> Result<AppState, ElectricityProviderError> {
    debug!(
        "resolving provider for price area {} with limit {}",
        config.price_area, config.limit
    );

    let electricity_provider = Energidataservice::new(
        &config.dataset_url,
        &config.price_area,
        config.limit,
        config.upstream_timeout,
    )?;

    Ok(AppState::new(
        Arc::new(electricity_provider),
        &DEFAULT_TARIFFS,
        config.timezone,
        config.request_timeout,
    ))
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) electricity_provider: Arc<dyn SpotPriceProvider>,
    pub(crate) tariffs: &'static TariffSchedule,
    pub(crate) timezone: Tz,
    pub(crate) request_timeout: Duration,
}

impl AppState {
    pub(crate) fn new(
        electricity_provider: Arc<dyn SpotPriceProvider>,
        tariffs: &'static TariffSchedule,
        timezone: Tz,
        request_timeout: Duration,
    ) -> Self {
        Self {
            electricity_provider,
            tariffs,
            timezone,
            request_timeout,
        }
    }
}

//! Service configuration. Everything has a fixed default; only the listening
//! port can be overridden from the environment.

use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

const DEFAULT_DATASET_URL: &str = "https://api.energidataservice.dk/dataset/Elspotprices";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
// Requests outlive the upstream call so a slow upstream still surfaces as an upstream error.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value \"{value}\": {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) port: u16,
    pub(crate) price_area: String,
    pub(crate) limit: u32,
    pub(crate) dataset_url: String,
    pub(crate) timezone: Tz,
    pub(crate) upstream_timeout: Duration,
    pub(crate) request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            price_area: "DK2".to_string(),
            limit: 168,
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            timezone: chrono_tz::Europe::Copenhagen,
            upstream_timeout: UPSTREAM_TIMEOUT,
            request_timeout: UPSTREAM_TIMEOUT + REQUEST_TIMEOUT_MARGIN,
        }
    }
}

impl Config {
    /// Read overrides from the environment. Anything not set keeps its default.
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Self {
            port: parse_or("PORT", &lookup, defaults.port)?,
            ..defaults
        })
    }
}

fn parse_or<T>(
    name: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

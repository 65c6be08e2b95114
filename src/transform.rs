use chrono::{NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::domain::{FrontendHourlyPrice, RawHourlyPrice};
use crate::tariff::TariffSchedule;

const HOUR_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("invalid HourUTC timestamp \"{value}\": {source}")]
    ParseTimestamp {
        value: String,
        source: chrono::ParseError,
    },
    #[error("no tariff bracket covers {0}")]
    UncoveredHour(NaiveDateTime),
}

/// Turn raw spot prices into consumer prices for the frontend.
/// The result has one entry per record, newest first. A single bad record
/// fails the whole batch.
pub(crate) fn transform(
    records: &[RawHourlyPrice],
    tariffs: &TariffSchedule,
    timezone: Tz,
) -> Result<Vec<FrontendHourlyPrice>, TransformError> {
    let mut prices = records
        .iter()
        .map(|record| transform_record(record, tariffs, timezone))
        .collect::<Result<Vec<FrontendHourlyPrice>, TransformError>>()?;

    prices.reverse();

    Ok(prices)
}

fn transform_record(
    record: &RawHourlyPrice,
    tariffs: &TariffSchedule,
    timezone: Tz,
) -> Result<FrontendHourlyPrice, TransformError> {
    let moment = NaiveDateTime::parse_from_str(&record.hour_utc, HOUR_UTC_FORMAT).map_err(|e| {
        TransformError::ParseTimestamp {
            value: record.hour_utc.clone(),
            source: e,
        }
    })?;

    let price = tariffs
        .consumer_price(record.spot_price_dkk, moment)
        .ok_or(TransformError::UncoveredHour(moment))?;

    Ok(FrontendHourlyPrice {
        start_time: to_local_rfc3339(moment, timezone),
        price: format!("{:.6}", price),
    })
}

fn to_local_rfc3339(moment: NaiveDateTime, timezone: Tz) -> String {
    Utc.from_utc_datetime(&moment)
        .with_timezone(&timezone)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

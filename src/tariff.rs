use std::ops::{Range, RangeInclusive};

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Grid tariff rates in DKK/kWh for each time-of-day bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TariffRates {
    pub(crate) low: f64,
    pub(crate) high: f64,
    pub(crate) peak: f64,
}

impl TariffRates {
    pub(crate) fn rate(&self, bracket: Bracket) -> f64 {
        match bracket {
            Bracket::Low => self.low,
            Bracket::High => self.high,
            Bracket::Peak => self.peak,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bracket {
    Low,
    High,
    Peak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Season {
    Summer,
    Winter,
}

/// A half-open range of hours of the day, in UTC.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HourBracket {
    pub(crate) hours: Range<u32>,
    pub(crate) bracket: Bracket,
}

/// Taxes, fees and grid tariffs applied on top of the raw spot price.
/// All amounts are DKK/kWh, excluding VAT.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TariffSchedule {
    pub(crate) state_tariff: f64,
    pub(crate) supplier_fee: f64,
    pub(crate) vat_multiplier: f64,
    pub(crate) summer_months: RangeInclusive<u32>,
    pub(crate) summer: TariffRates,
    pub(crate) winter: TariffRates,
    pub(crate) brackets: &'static [HourBracket],
}

/// Cerius grid tariffs, the fixed "elafgift" and the EWII supplier fee.
pub(crate) static DEFAULT_TARIFFS: TariffSchedule = TariffSchedule {
    state_tariff: 0.7610,
    supplier_fee: 0.0975,
    vat_multiplier: 1.25,
    summer_months: 4..=9,
    summer: TariffRates {
        low: 0.1126,
        high: 0.1689,
        peak: 0.4391,
    },
    winter: TariffRates {
        low: 0.1126,
        high: 0.3378,
        peak: 1.0133,
    },
    brackets: &[
        HourBracket {
            hours: 0..6,
            bracket: Bracket::Low,
        },
        HourBracket {
            hours: 6..17,
            bracket: Bracket::High,
        },
        HourBracket {
            hours: 17..21,
            bracket: Bracket::Peak,
        },
        HourBracket {
            hours: 21..24,
            bracket: Bracket::High,
        },
    ],
};

impl TariffSchedule {
    pub(crate) fn season(&self, month: u32) -> Season {
        if self.summer_months.contains(&month) {
            Season::Summer
        } else {
            Season::Winter
        }
    }

    pub(crate) fn rates(&self, season: Season) -> &TariffRates {
        match season {
            Season::Summer => &self.summer,
            Season::Winter => &self.winter,
        }
    }

    pub(crate) fn bracket(&self, hour: u32) -> Option<Bracket> {
        self.brackets
            .iter()
            .find(|b| b.hours.contains(&hour))
            .map(|b| b.bracket)
    }

    /// Final consumer price in DKK/kWh incl. VAT for a spot price given in DKK/MWh.
    /// Season and bracket are taken from the UTC moment. Returns `None` when no
    /// bracket covers the hour.
    pub(crate) fn consumer_price(
        &self,
        spot_price_dkk_mwh: f64,
        moment: NaiveDateTime,
    ) -> Option<f64> {
        let bracket = self.bracket(moment.hour())?;
        let tariff = self.rates(self.season(moment.month())).rate(bracket);

        let mut price = spot_price_dkk_mwh / 1000.0;
        price += self.state_tariff;
        price += self.supplier_fee;
        price += tariff;

        Some(price * self.vat_multiplier)
    }
}

//! Historical rate models.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::parse_date;
use crate::currency::{CurrencyCode, is_supported};
use crate::{RateError, Result};

/// Rates from one base currency on one UTC calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub base_currency_code: String,
    #[serde(default)]
    pub conversion_rates: BTreeMap<String, Decimal>,
}

/// Consecutive daily points, oldest first.
pub type HistorySeries = Vec<HistoryPoint>;

impl HistoryPoint {
    /// Placeholder for a date whose fetch failed; renders as a gap.
    #[must_use]
    pub fn empty(date: NaiveDate, base: &CurrencyCode) -> Self {
        Self {
            date,
            base_currency_code: base.as_str().to_string(),
            conversion_rates: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversion_rates.is_empty()
    }

    /// `true` if this point answers `date` for `base` with real rates.
    #[must_use]
    pub fn resolves(&self, date: NaiveDate, base: &CurrencyCode) -> bool {
        self.date == date && self.base_currency_code == base.as_str() && !self.is_empty()
    }
}

/// Response body of the per-date historical endpoint:
/// `{ "date": "2024-03-06", "usd": { "eur": 0.92, ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub date: String,
    #[serde(flatten)]
    pub rates_by_base: BTreeMap<String, serde_json::Value>,
}

impl HistoryResponse {
    /// Extracts the requested base's rates as a [`HistoryPoint`] for `date`.
    ///
    /// Codes are upper-cased and restricted to supported currencies;
    /// non-numeric entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Provider`] if the base mapping is missing or
    /// yields no usable rates.
    pub fn into_history_point(self, date: NaiveDate, base: &CurrencyCode) -> Result<HistoryPoint> {
        let key = base.to_lowercase();
        let raw = self
            .rates_by_base
            .get(&key)
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| {
                RateError::Provider(format!("history for {base} on {date} has no {key:?} mapping"))
            })?;

        if parse_date(&self.date).ok() != Some(date) {
            debug!(requested = %date, answered = %self.date, %base, "Provider answered a different date");
        }

        let conversion_rates: BTreeMap<String, Decimal> = raw
            .iter()
            .filter_map(|(code, value)| {
                let code = code.to_ascii_uppercase();
                if !is_supported(&code) {
                    return None;
                }
                let rate = serde_json::from_value::<Decimal>(value.clone()).ok()?;
                Some((code, rate))
            })
            .collect();

        if conversion_rates.is_empty() {
            return Err(RateError::Provider(format!(
                "history for {base} on {date} contained no supported rates"
            )));
        }

        Ok(HistoryPoint {
            date,
            base_currency_code: base.as_str().to_string(),
            conversion_rates,
        })
    }
}

//! Latest-rates snapshot models.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyCode;
use crate::{RateError, Result};

/// Response body of `GET <base>/<key>/latest/<CODE>`.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestRatesResponse {
    /// `"success"` or `"error"`.
    pub result: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub terms_of_use: String,
    #[serde(default)]
    pub time_last_update_unix: i64,
    #[serde(default)]
    pub time_last_update_utc: String,
    #[serde(default)]
    pub time_next_update_unix: i64,
    #[serde(default)]
    pub time_next_update_utc: String,
    #[serde(default)]
    pub base_code: String,
    #[serde(default)]
    pub conversion_rates: BTreeMap<String, Decimal>,
    /// Present on error responses, e.g. `"unsupported-code"`.
    #[serde(rename = "error-type", default)]
    pub error_type: Option<String>,
}

/// One snapshot of conversion rates from a base currency.
///
/// This is also the persisted shape of a live cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRate {
    pub api_status: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub terms_of_use: String,
    pub time_last_update_unix: i64,
    #[serde(rename = "timeLastUpdateUTC", default)]
    pub time_last_update_utc: String,
    pub time_next_update_unix: i64,
    #[serde(rename = "timeNextUpdateUTC", default)]
    pub time_next_update_utc: String,
    pub base_currency_code: String,
    pub conversion_rates: BTreeMap<String, Decimal>,
}

impl ConversionRate {
    /// An empty snapshot marks a failed or placeholder fetch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversion_rates.is_empty()
    }

    /// Rate from the base currency into `target`, if quoted.
    #[must_use]
    pub fn rate_for(&self, target: &str) -> Option<Decimal> {
        self.conversion_rates.get(target).copied()
    }

    /// Epoch milliseconds at which the provider publishes the next snapshot.
    ///
    /// `None` when the provider sent no usable timestamp (absent fields
    /// deserialize as `0`), so schedulers fall back to their default interval.
    #[must_use]
    pub fn next_update_millis(&self) -> Option<i64> {
        Some(self.time_next_update_unix)
            .filter(|secs| *secs > 0)
            .and_then(|secs| secs.checked_mul(1000))
    }
}

impl LatestRatesResponse {
    /// Validates the payload and maps it into a [`ConversionRate`].
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Provider`] if the result is not `"success"`, the
    /// base code does not match the request, or no rates were quoted.
    pub fn into_conversion_rate(self, requested: &CurrencyCode) -> Result<ConversionRate> {
        if self.result != "success" {
            return Err(RateError::Provider(format!(
                "latest rates for {requested} returned {:?} ({})",
                self.result,
                self.error_type.as_deref().unwrap_or("no error type")
            )));
        }
        if !self.base_code.eq_ignore_ascii_case(requested.as_str()) {
            return Err(RateError::Provider(format!(
                "latest rates for {requested} answered with base {:?}",
                self.base_code
            )));
        }
        if self.conversion_rates.is_empty() {
            return Err(RateError::Provider(format!(
                "latest rates for {requested} contained no conversion rates"
            )));
        }

        Ok(ConversionRate {
            api_status: self.result,
            documentation: self.documentation,
            terms_of_use: self.terms_of_use,
            time_last_update_unix: self.time_last_update_unix,
            time_last_update_utc: self.time_last_update_utc,
            time_next_update_unix: self.time_next_update_unix,
            time_next_update_utc: self.time_next_update_utc,
            base_currency_code: requested.as_str().to_string(),
            conversion_rates: self.conversion_rates,
        })
    }
}

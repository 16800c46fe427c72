//! Single-pair conversion models used by the calculator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{RateError, Result};

/// Response body of `GET <base>/<key>/pair/<FROM>/<TO>/1`.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConversionResponse {
    pub result: String,
    #[serde(default)]
    pub base_code: String,
    #[serde(default)]
    pub target_code: String,
    #[serde(default)]
    pub conversion_rate: Option<Decimal>,
    #[serde(default)]
    pub time_next_update_unix: i64,
    #[serde(rename = "error-type", default)]
    pub error_type: Option<String>,
}

/// A cached pair rate; persisted as `{ "rate": .., "expiresAt": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRate {
    pub rate: Decimal,
    /// Epoch milliseconds after which the rate is stale.
    pub expires_at: i64,
}

impl PairRate {
    #[must_use]
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}

impl PairConversionResponse {
    /// # Errors
    ///
    /// Returns [`RateError::Provider`] unless the result is `"success"` with
    /// a conversion rate.
    pub fn into_pair_rate(self) -> Result<PairRate> {
        if self.result != "success" {
            return Err(RateError::Provider(format!(
                "pair {}->{} returned {:?} ({})",
                self.base_code,
                self.target_code,
                self.result,
                self.error_type.as_deref().unwrap_or("no error type")
            )));
        }
        let rate = self.conversion_rate.ok_or_else(|| {
            RateError::Provider(format!(
                "pair {}->{} is missing conversion_rate",
                self.base_code, self.target_code
            ))
        })?;

        Ok(PairRate {
            rate,
            expires_at: self.time_next_update_unix.saturating_mul(1000),
        })
    }
}

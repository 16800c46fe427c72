//! Currency codes and the set of codes the rate provider serves.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{RateError, Result};

/// ISO 4217 codes served by the live and historical rate providers.
///
/// Kept sorted so [`supported_currency_codes`] can return it as-is.
pub const SUPPORTED_CODES: &[&str] = &[
    "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AWG", "AZN", "BAM", "BBD", "BDT",
    "BGN", "BHD", "BIF", "BMD", "BND", "BOB", "BRL", "BSD", "BTN", "BWP", "BYN", "BZD", "CAD",
    "CDF", "CHF", "CLP", "CNY", "COP", "CRC", "CUP", "CVE", "CZK", "DJF", "DKK", "DOP", "DZD",
    "EGP", "ERN", "ETB", "EUR", "FJD", "FKP", "FOK", "GBP", "GEL", "GGP", "GHS", "GIP", "GMD",
    "GNF", "GTQ", "GYD", "HKD", "HNL", "HRK", "HTG", "HUF", "IDR", "ILS", "IMP", "INR", "IQD",
    "IRR", "ISK", "JEP", "JMD", "JOD", "JPY", "KES", "KGS", "KHR", "KID", "KMF", "KRW", "KWD",
    "KYD", "KZT", "LAK", "LBP", "LKR", "LRD", "LSL", "LYD", "MAD", "MDL", "MGA", "MKD", "MMK",
    "MNT", "MOP", "MRU", "MUR", "MVR", "MWK", "MXN", "MYR", "MZN", "NAD", "NGN", "NIO", "NOK",
    "NPR", "NZD", "OMR", "PAB", "PEN", "PGK", "PHP", "PKR", "PLN", "PYG", "QAR", "RON", "RSD",
    "RUB", "RWF", "SAR", "SBD", "SCR", "SDG", "SEK", "SGD", "SHP", "SLE", "SLL", "SOS", "SRD",
    "SSP", "STN", "SYP", "SZL", "THB", "TJS", "TMT", "TND", "TOP", "TRY", "TTD", "TVD", "TWD",
    "TZS", "UAH", "UGX", "USD", "UYU", "UZS", "VES", "VND", "VUV", "WST", "XAF", "XCD", "XDR",
    "XOF", "XPF", "YER", "ZAR", "ZMW", "ZWL",
];

/// Returns every supported currency code in sorted order.
#[must_use]
pub fn supported_currency_codes() -> Vec<&'static str> {
    SUPPORTED_CODES.to_vec()
}

/// Returns `true` if the (already normalized) code is in [`SUPPORTED_CODES`].
#[must_use]
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_CODES.binary_search(&code).is_ok()
}

/// A trimmed, upper-cased alphabetic currency code such as `"USD"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Normalizes `raw` (trim + upper-case) and checks it is alphabetic.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::UnsupportedCurrency`] if the code is empty or
    /// contains anything other than ASCII letters.
    pub fn parse(raw: &str) -> Result<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RateError::UnsupportedCurrency(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// Like [`CurrencyCode::parse`], but also requires the provider to serve it.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::UnsupportedCurrency`] for malformed or unknown codes.
    pub fn supported(raw: &str) -> Result<Self> {
        let code = Self::parse(raw)?;
        if !is_supported(&code.0) {
            return Err(RateError::UnsupportedCurrency(raw.to_string()));
        }
        Ok(code)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used in the historical provider's URLs and payloads.
    #[must_use]
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_codes_are_sorted_and_unique() {
        assert!(SUPPORTED_CODES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn parse_trims_and_uppercases() {
        let code = CurrencyCode::parse("  usd ").unwrap();
        assert_eq!(code.as_str(), "USD");
        assert_eq!(code.to_lowercase(), "usd");
    }

    #[test]
    fn parse_rejects_empty_and_non_alphabetic() {
        assert!(CurrencyCode::parse("   ").is_err());
        assert!(CurrencyCode::parse("US1").is_err());
        assert!(CurrencyCode::parse("U-D").is_err());
    }

    #[test]
    fn supported_rejects_unknown_codes() {
        assert!(CurrencyCode::supported("myr").is_ok());
        let err = CurrencyCode::supported("ABC").unwrap_err();
        assert!(matches!(err, RateError::UnsupportedCurrency(_)));
    }
}

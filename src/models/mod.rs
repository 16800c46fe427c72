//! Domain and wire models for the live, historical and pair-rate providers.
//!
//! Domain types ([`ConversionRate`], [`HistoryPoint`], [`PairRate`]) are what
//! the cache persists and subscribers receive. The `*Response` types mirror
//! the provider JSON and are converted at the fetcher boundary.

pub mod history;
pub mod live;
pub mod pair;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use history::{HistoryPoint, HistoryResponse, HistorySeries};
pub use live::{ConversionRate, LatestRatesResponse};
pub use pair::{PairConversionResponse, PairRate};

use crate::{RateError, Result};

/// Length of a history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Daily,
    Weekly,
    Monthly,
}

impl RangeKind {
    /// Number of consecutive calendar days in the window.
    #[must_use]
    pub fn days(self) -> u32 {
        match self {
            RangeKind::Daily => 1,
            RangeKind::Weekly => 7,
            RangeKind::Monthly => 30,
        }
    }

    /// Returns the name used in storage keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RangeKind::Daily => "daily",
            RangeKind::Weekly => "weekly",
            RangeKind::Monthly => "monthly",
        }
    }

    /// Parses `daily`, `weekly` or `monthly` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Config`] for any other value.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RangeKind::Daily),
            "weekly" => Ok(RangeKind::Weekly),
            "monthly" => Ok(RangeKind::Monthly),
            other => Err(RateError::Config(format!("unknown range kind {other:?}"))),
        }
    }
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

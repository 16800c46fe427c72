//! Amount conversion between two currencies.
//!
//! Pair rates are cached until the provider's next update. A failed refresh
//! falls back to the stale cached rate when one exists.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::Result;
use crate::cache::RateCache;
use crate::clock::{Clock, epoch_millis};
use crate::currency::CurrencyCode;
use crate::fetcher::RateFetcher;

/// Converts amounts using cached or freshly fetched pair rates.
pub struct Calculator {
    fetcher: Arc<dyn RateFetcher>,
    cache: Arc<RateCache>,
    clock: Arc<dyn Clock>,
}

impl Calculator {
    #[must_use]
    pub fn new(fetcher: Arc<dyn RateFetcher>, cache: Arc<RateCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            cache,
            clock,
        }
    }

    /// Converts `amount` of `from` into `to`.
    ///
    /// # Errors
    ///
    /// See [`Calculator::rate`].
    pub async fn convert(&self, from: &str, to: &str, amount: Decimal) -> Result<Decimal> {
        let rate = self.rate(from, to).await?;
        Ok(amount * rate)
    }

    /// Rate for one unit of `base` in `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::UnsupportedCurrency`](crate::RateError::UnsupportedCurrency)
    /// for unknown codes, or the fetch error when the pair has never been
    /// cached.
    pub async fn rate(&self, base: &str, target: &str) -> Result<Decimal> {
        let base = CurrencyCode::supported(base)?;
        let target = CurrencyCode::supported(target)?;
        if base == target {
            return Ok(Decimal::ONE);
        }

        let cached = self.cache.read_pair(&base, &target);
        let now_ms = epoch_millis(self.clock.now());
        if let Some(cached) = cached.filter(|c| c.is_fresh(now_ms)) {
            debug!(%base, %target, "Serving cached pair rate");
            return Ok(cached.rate);
        }

        match self.fetcher.fetch_pair(&base, &target).await {
            Ok(fresh) => {
                self.cache.write_pair(&base, &target, &fresh);
                Ok(fresh.rate)
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!(%base, %target, error = %e, "Pair fetch failed, serving stale rate");
                    Ok(stale.rate)
                }
                None => Err(e),
            },
        }
    }
}

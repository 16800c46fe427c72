//! Latest-rate strategy: expiry-driven refresh of one base currency.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::RateSource;
use crate::{RateError, Result};
use crate::cache::{RateCache, live_key};
use crate::clock::{Clock, delay_until};
use crate::currency::CurrencyCode;
use crate::fetcher::RateFetcher;
use crate::models::ConversionRate;

/// Polls the latest snapshot for one base currency.
pub struct LiveSource {
    base: CurrencyCode,
    fetcher: Arc<dyn RateFetcher>,
    cache: Arc<RateCache>,
    clock: Arc<dyn Clock>,
    fallback_interval: Duration,
}

impl LiveSource {
    #[must_use]
    pub fn new(
        base: CurrencyCode,
        fetcher: Arc<dyn RateFetcher>,
        cache: Arc<RateCache>,
        clock: Arc<dyn Clock>,
        fallback_interval: Duration,
    ) -> Self {
        Self {
            base,
            fetcher,
            cache,
            clock,
            fallback_interval,
        }
    }
}

#[async_trait]
impl RateSource for LiveSource {
    type Output = ConversionRate;

    fn label(&self) -> String {
        live_key(&self.base)
    }

    fn check_cache(&self) -> Option<ConversionRate> {
        self.cache.read_live(&self.base)
    }

    async fn fetch(&self) -> Result<ConversionRate> {
        let rate = self.fetcher.fetch_live(&self.base).await?;
        // An empty snapshot must never replace stored rates or reach subscribers.
        if rate.is_empty() {
            return Err(RateError::Provider(format!(
                "latest rates for {} contained no conversion rates",
                self.base
            )));
        }
        self.cache.write_live(&self.base, &rate);
        Ok(rate)
    }

    fn next_delay(&self, latest: &ConversionRate) -> Duration {
        delay_until(
            latest.next_update_millis(),
            self.clock.now(),
            self.fallback_interval,
        )
    }
}

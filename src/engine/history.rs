//! History strategy: a per-day series for one (range, base) pair.
//!
//! Dates are resolved oldest to newest, one at a time. A date already cached
//! with rates is never fetched again; a missing date gets a bounded number of
//! retries and then an empty placeholder, so one bad date never blocks the
//! rest. The whole series only fails when nothing in the window resolved,
//! which sends the engine into its outer retry ring.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::RateSource;
use crate::cache::{RateCache, SeriesByDate, history_key};
use crate::clock::{Clock, delay_until, epoch_millis, expected_dates, next_utc_midnight, utc_today};
use crate::currency::CurrencyCode;
use crate::fetcher::RateFetcher;
use crate::models::{HistoryPoint, HistorySeries, RangeKind};
use crate::{RateError, Result};

/// Per-date retry settings.
#[derive(Debug, Clone, Copy)]
pub struct DateRetry {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub delay: Duration,
}

/// Assembles and refreshes the history series for one (range, base) key.
pub struct HistorySource {
    range: RangeKind,
    base: CurrencyCode,
    fetcher: Arc<dyn RateFetcher>,
    cache: Arc<RateCache>,
    clock: Arc<dyn Clock>,
    date_retry: DateRetry,
    fallback_interval: Duration,
}

impl HistorySource {
    #[must_use]
    pub fn new(
        range: RangeKind,
        base: CurrencyCode,
        fetcher: Arc<dyn RateFetcher>,
        cache: Arc<RateCache>,
        clock: Arc<dyn Clock>,
        date_retry: DateRetry,
        fallback_interval: Duration,
    ) -> Self {
        Self {
            range,
            base,
            fetcher,
            cache,
            clock,
            date_retry,
            fallback_interval,
        }
    }

    fn window(&self) -> Vec<NaiveDate> {
        expected_dates(utc_today(self.clock.now()), self.range)
    }

    /// Resolves every date of the current window into a full series.
    ///
    /// The stored entry is pruned to the window before any fetch. Each
    /// successfully fetched point is written back immediately, so progress
    /// survives an interrupted run. Placeholders are never stored.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Provider`] when no date in the window could be
    /// resolved with rates.
    pub async fn assemble(&self) -> Result<HistorySeries> {
        let window = self.window();
        let cached = self.cache.update_history_entry(self.range, &self.base, |entry| {
            let pruned = RateCache::prune_to_window(std::mem::take(entry), &window);
            *entry = pruned;
        });

        let mut series = HistorySeries::with_capacity(window.len());
        let mut resolved = 0usize;

        for date in &window {
            let point = match cached.get(date).filter(|p| p.resolves(*date, &self.base)) {
                Some(point) => point.clone(),
                None => self.fetch_date(*date).await,
            };
            if !point.is_empty() {
                resolved += 1;
            }
            series.push(point);
        }

        if resolved == 0 {
            return Err(RateError::Provider(format!(
                "no date in the {} window for {} could be resolved",
                self.range, self.base
            )));
        }

        debug!(
            key = %history_key(self.range, &self.base),
            points = series.len(),
            resolved,
            "Assembled history series"
        );
        Ok(series)
    }

    /// Fetches one date with bounded retries, falling back to an empty point.
    async fn fetch_date(&self, date: NaiveDate) -> HistoryPoint {
        let mut retries_left = self.date_retry.max_retries;
        loop {
            match self.fetcher.fetch_history_point(date, &self.base).await {
                Ok(point) => {
                    self.store_point(&point);
                    return point;
                }
                Err(e) if retries_left > 0 => {
                    warn!(%date, base = %self.base, retries_left, error = %e, "History fetch failed, retrying");
                    retries_left -= 1;
                    tokio::time::sleep(self.date_retry.delay).await;
                }
                Err(e) => {
                    warn!(%date, base = %self.base, error = %e, "History fetch failed, leaving a gap");
                    return HistoryPoint::empty(date, &self.base);
                }
            }
        }
    }

    fn store_point(&self, point: &HistoryPoint) {
        if point.is_empty() {
            return;
        }
        self.cache
            .update_history_entry(self.range, &self.base, |entry: &mut SeriesByDate| {
                entry.insert(point.date, point.clone());
            });
    }
}

#[async_trait]
impl RateSource for HistorySource {
    type Output = HistorySeries;

    fn label(&self) -> String {
        history_key(self.range, &self.base)
    }

    fn check_cache(&self) -> Option<HistorySeries> {
        self.cache
            .read_history_series(self.range, &self.base, &self.window())
    }

    async fn fetch(&self) -> Result<HistorySeries> {
        self.assemble().await
    }

    /// Refresh at the next UTC midnight, when the window slides by a day.
    fn next_delay(&self, _latest: &HistorySeries) -> Duration {
        let now = self.clock.now();
        let due = next_utc_midnight(now).map(epoch_millis);
        delay_until(due, now, self.fallback_interval)
    }
}

//! Selection-driven entry point for dashboard consumers.
//!
//! [`RateBoard`] owns one multiplexer per query kind and the current
//! selection (base currency and history range). Subscriptions returned by
//! [`RateBoard::live_rates`] and [`RateBoard::history_series`] follow the
//! selection: when it changes they detach from the old key's stream and
//! attach to the new key's.

use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::Result;
use crate::cache::RateCache;
use crate::clock::Clock;
use crate::config::PollingConfig;
use crate::currency::CurrencyCode;
use crate::engine::history::DateRetry;
use crate::engine::{HistorySource, LiveSource, RateSource};
use crate::fetcher::RateFetcher;
use crate::models::{ConversionRate, HistorySeries, RangeKind};
use crate::stream::{Multiplexer, SharedStream, Subscription};

/// Key of a history stream.
pub type HistoryKey = (RangeKind, CurrencyCode);

/// The currently selected base currency and history range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub base: CurrencyCode,
    pub range: RangeKind,
}

/// Live and history streams plus the selection that routes them.
pub struct RateBoard {
    live: Arc<Multiplexer<CurrencyCode, LiveSource>>,
    history: Arc<Multiplexer<HistoryKey, HistorySource>>,
    selection: watch::Sender<Selection>,
}

impl RateBoard {
    /// Builds a board whose engines share one fetcher, cache and clock.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn RateFetcher>,
        cache: Arc<RateCache>,
        clock: Arc<dyn Clock>,
        polling: PollingConfig,
        initial: Selection,
    ) -> Self {
        let live = {
            let (fetcher, cache, clock) = (fetcher.clone(), cache.clone(), clock.clone());
            Multiplexer::new(polling.retry_policy(), move |base: &CurrencyCode| {
                LiveSource::new(
                    base.clone(),
                    fetcher.clone(),
                    cache.clone(),
                    clock.clone(),
                    polling.poll_interval,
                )
            })
        };

        let date_retry = DateRetry {
            max_retries: polling.max_date_retries,
            delay: polling.date_retry_delay,
        };
        let history = Multiplexer::new(polling.retry_policy(), move |key: &HistoryKey| {
            let (range, base) = key;
            HistorySource::new(
                *range,
                base.clone(),
                fetcher.clone(),
                cache.clone(),
                clock.clone(),
                date_retry,
                polling.poll_interval,
            )
        });

        Self {
            live: Arc::new(live),
            history: Arc::new(history),
            selection: watch::Sender::new(initial),
        }
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    /// Switches the selected base currency.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::UnsupportedCurrency`](crate::RateError::UnsupportedCurrency)
    /// for unknown codes; the selection and every stream are left untouched.
    pub fn request_base_currency_change(&self, code: &str) -> Result<()> {
        let base = CurrencyCode::supported(code).inspect_err(|e| {
            warn!(code, error = %e, "Rejected base currency change");
        })?;
        let changed = self.selection.send_if_modified(|selection| {
            if selection.base == base {
                return false;
            }
            selection.base = base.clone();
            true
        });
        if changed {
            info!(%base, "Base currency changed");
        }
        Ok(())
    }

    /// Switches the selected history range.
    pub fn request_date_range_change(&self, range: RangeKind) {
        let changed = self.selection.send_if_modified(|selection| {
            if selection.range == range {
                return false;
            }
            selection.range = range;
            true
        });
        if changed {
            info!(%range, "History range changed");
        }
    }

    /// Shared live stream for a specific base, independent of the selection.
    pub fn live_stream(&self, base: &CurrencyCode) -> SharedStream<ConversionRate> {
        self.live.stream_for(base)
    }

    /// Shared history stream for a specific key, independent of the selection.
    pub fn history_stream(
        &self,
        range: RangeKind,
        base: &CurrencyCode,
    ) -> SharedStream<HistorySeries> {
        self.history.stream_for(&(range, base.clone()))
    }

    /// Live snapshots for whichever base is selected.
    pub fn live_rates(&self) -> Subscription<ConversionRate> {
        route(Arc::clone(&self.live), self.selection.subscribe(), |s| {
            s.base.clone()
        })
    }

    /// History series for whichever (range, base) is selected.
    pub fn history_series(&self) -> Subscription<HistorySeries> {
        route(Arc::clone(&self.history), self.selection.subscribe(), |s| {
            (s.range, s.base.clone())
        })
    }

    /// Number of live engines currently running.
    #[must_use]
    pub fn active_live_engines(&self) -> usize {
        self.live.active_count()
    }

    /// Number of history engines currently running.
    #[must_use]
    pub fn active_history_engines(&self) -> usize {
        self.history.active_count()
    }
}

/// Spawns a task forwarding the selected key's stream into a fresh channel.
///
/// The task ends when the board is dropped or every receiver is gone.
fn route<K, S>(
    mux: Arc<Multiplexer<K, S>>,
    mut selection: watch::Receiver<Selection>,
    key_of: fn(&Selection) -> K,
) -> Subscription<S::Output>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    S: RateSource,
{
    let (tx, rx) = watch::channel(None);

    tokio::spawn(async move {
        let mut key = key_of(&selection.borrow_and_update());
        let mut current = mux.stream_for(&key).subscribe();

        loop {
            tokio::select! {
                value = current.next() => match value {
                    Some(value) => {
                        tx.send_replace(Some(value));
                    }
                    None => return,
                },
                changed = selection.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let next_key = key_of(&selection.borrow_and_update());
                    if next_key != key {
                        key = next_key;
                        current = mux.stream_for(&key).subscribe();
                        tx.send_replace(None);
                        debug!("Rerouted subscription to new key");
                    }
                }
                () = tx.closed() => return,
            }
        }
    });

    Subscription::from_receiver(rx)
}

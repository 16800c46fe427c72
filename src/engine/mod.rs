//! Poll-until-next-update scheduling.
//!
//! This module is organized by query kind:
//! - [`live`] - Latest snapshot per base currency, refreshed at the
//!   provider-declared next-update time
//! - [`history`] - Daily series per (range, base), refreshed at UTC midnight
//!
//! Both are [`RateSource`] strategies driven by the same [`PollEngine`]:
//! serve the cache if it is valid, otherwise fetch until a fetch succeeds,
//! publish, sleep until the next update is due, and repeat.

pub mod history;
pub mod live;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::Result;

pub use history::HistorySource;
pub use live::LiveSource;

/// Latest published value of an engine; `None` until the first emission.
pub type Latest<T> = Option<Arc<T>>;

/// Query-kind strategy consulted by [`PollEngine`].
#[async_trait]
pub trait RateSource: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Label used in logs, e.g. the storage key.
    fn label(&self) -> String;

    /// A value that may be served without touching the network.
    fn check_cache(&self) -> Option<Self::Output>;

    /// One fetch attempt, including any cache write on success.
    async fn fetch(&self) -> Result<Self::Output>;

    /// How long to wait after publishing `latest` before fetching again.
    fn next_delay(&self, latest: &Self::Output) -> Duration;
}

/// Delay schedule between failed fetch attempts.
///
/// Starts at `initial` and doubles up to `max`. With `initial == max` the
/// delay is fixed. Retries never give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    initial: Duration,
    max: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, interval)
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Drives one [`RateSource`] forever, publishing into a watch channel.
pub struct PollEngine<S: RateSource> {
    source: S,
    retry: RetryPolicy,
    tx: watch::Sender<Latest<S::Output>>,
}

impl<S: RateSource> PollEngine<S> {
    #[must_use]
    pub fn new(source: S, retry: RetryPolicy, tx: watch::Sender<Latest<S::Output>>) -> Self {
        Self { source, retry, tx }
    }

    /// Runs the start → (fetching) → scheduled cycle indefinitely.
    ///
    /// There is no terminal state; the task is stopped by aborting it.
    pub async fn run(self) {
        let label = self.source.label();

        let mut latest = match self.source.check_cache() {
            Some(cached) => {
                debug!(key = %label, "Serving cached value");
                cached
            }
            None => {
                debug!(key = %label, "Cache miss, fetching");
                self.fetch_until_ok(&label).await
            }
        };

        loop {
            let delay = self.source.next_delay(&latest);
            self.tx.send_replace(Some(Arc::new(latest)));
            info!(
                key = %label,
                next_refresh_secs = delay.as_secs(),
                "Published value"
            );

            tokio::time::sleep(delay).await;
            latest = self.fetch_until_ok(&label).await;
        }
    }

    async fn fetch_until_ok(&self, label: &str) -> S::Output {
        let mut attempt: u32 = 0;
        loop {
            match self.source.fetch().await {
                Ok(value) => return value,
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    let backoff = self.retry.delay_for(attempt);
                    warn!(
                        key = %label,
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

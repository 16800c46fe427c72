//! Shared test utilities: a scripted fetcher and a wired-up cache.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use ratewatch::cache::RateCache;
use ratewatch::clock::{AnchoredClock, Clock, epoch_millis};
use ratewatch::config::PollingConfig;
use ratewatch::currency::CurrencyCode;
use ratewatch::fetcher::RateFetcher;
use ratewatch::models::{ConversionRate, HistoryPoint, PairRate};
use ratewatch::storage::{KeyValueStore, MemoryStore};
use ratewatch::{RateError, Result};

/// Wall time every paused-clock test starts at.
pub const START: &str = "2024-03-06T12:00:00Z";

/// Polling interval used by tests; every retry waits this long.
pub const POLL: Duration = Duration::from_secs(60);

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

pub fn code(raw: &str) -> CurrencyCode {
    CurrencyCode::parse(raw).expect("valid code")
}

pub fn polling() -> PollingConfig {
    PollingConfig {
        poll_interval: POLL,
        max_retry_interval: POLL,
        date_retry_delay: POLL,
        max_date_retries: 3,
    }
}

/// A successful snapshot for `base` expiring at `next_update_unix`.
pub fn sample_rate(base: &str, next_update_unix: i64) -> ConversionRate {
    let mut conversion_rates = BTreeMap::new();
    conversion_rates.insert("EUR".to_string(), Decimal::new(92, 2));
    conversion_rates.insert("MYR".to_string(), Decimal::new(47, 1));
    ConversionRate {
        api_status: "success".to_string(),
        documentation: String::new(),
        terms_of_use: String::new(),
        time_last_update_unix: next_update_unix - 86_400,
        time_last_update_utc: String::new(),
        time_next_update_unix: next_update_unix,
        time_next_update_utc: String::new(),
        base_currency_code: base.to_string(),
        conversion_rates,
    }
}

/// A history point whose MYR rate is the day of the month.
pub fn sample_point(day: NaiveDate, base: &str) -> HistoryPoint {
    let mut conversion_rates = BTreeMap::new();
    conversion_rates.insert(
        "MYR".to_string(),
        Decimal::from(chrono::Datelike::day(&day)),
    );
    HistoryPoint {
        date: day,
        base_currency_code: base.to_string(),
        conversion_rates,
    }
}

/// Scripted [`RateFetcher`] that counts every call.
///
/// Live and pair replies are consumed from queues (an exhausted queue is a
/// provider error). History dates succeed unless scripted to fail.
#[derive(Default)]
pub struct ScriptedFetcher {
    live_replies: Mutex<VecDeque<Option<ConversionRate>>>,
    live_latency: Mutex<Duration>,
    live_calls: AtomicUsize,
    history_failures: Mutex<HashMap<NaiveDate, u32>>,
    history_calls: Mutex<Vec<NaiveDate>>,
    pair_replies: Mutex<VecDeque<Option<PairRate>>>,
    pair_calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_live(&self, rate: ConversionRate) {
        self.live_replies.lock().push_back(Some(rate));
    }

    pub fn push_live_failure(&self) {
        self.live_replies.lock().push_back(None);
    }

    pub fn set_live_latency(&self, latency: Duration) {
        *self.live_latency.lock() = latency;
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    /// Makes the next `times` fetches of `day` fail.
    pub fn fail_date(&self, day: NaiveDate, times: u32) {
        self.history_failures.lock().insert(day, times);
    }

    pub fn history_calls(&self) -> Vec<NaiveDate> {
        self.history_calls.lock().clone()
    }

    pub fn history_calls_for(&self, day: NaiveDate) -> usize {
        self.history_calls.lock().iter().filter(|d| **d == day).count()
    }

    pub fn push_pair(&self, rate: PairRate) {
        self.pair_replies.lock().push_back(Some(rate));
    }

    pub fn push_pair_failure(&self) {
        self.pair_replies.lock().push_back(None);
    }

    pub fn pair_calls(&self) -> usize {
        self.pair_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateFetcher for ScriptedFetcher {
    async fn fetch_live(&self, base: &CurrencyCode) -> Result<ConversionRate> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.live_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let reply = self.live_replies.lock().pop_front().flatten();
        reply.ok_or_else(|| RateError::Provider(format!("scripted failure for {base}")))
    }

    async fn fetch_history_point(&self, day: NaiveDate, base: &CurrencyCode) -> Result<HistoryPoint> {
        self.history_calls.lock().push(day);
        let mut failures = self.history_failures.lock();
        if let Some(left) = failures.get_mut(&day)
            && *left > 0
        {
            *left -= 1;
            return Err(RateError::Provider(format!("scripted failure for {day}")));
        }
        Ok(sample_point(day, base.as_str()))
    }

    async fn fetch_pair(&self, base: &CurrencyCode, target: &CurrencyCode) -> Result<PairRate> {
        self.pair_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.pair_replies.lock().pop_front().flatten();
        reply.ok_or_else(|| RateError::Provider(format!("scripted failure for {base}->{target}")))
    }
}

/// Cache, store, clock and fetcher wired together for one test.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<AnchoredClock>,
    pub cache: Arc<RateCache>,
    pub fetcher: Arc<ScriptedFetcher>,
}

impl Harness {
    /// Must be called inside a (paused) tokio runtime.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(AnchoredClock::new(at(START)));
        let cache = Arc::new(RateCache::new(
            store.clone() as Arc<dyn KeyValueStore>,
            clock.clone() as Arc<dyn Clock>,
        ));
        Self {
            store,
            clock,
            cache,
            fetcher: ScriptedFetcher::new(),
        }
    }

    pub fn fetcher(&self) -> Arc<dyn RateFetcher> {
        self.fetcher.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn now_unix(&self) -> i64 {
        epoch_millis(self.clock.now()) / 1000
    }
}

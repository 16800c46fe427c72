//! Validity-aware cache over a [`KeyValueStore`].
//!
//! Live snapshots are valid until the provider's next-update timestamp.
//! History points are valid forever once they hold rates; a history entry is
//! only usable without the network when it covers the whole window.
//!
//! Unparsable stored values are treated as absent. Read-modify-write cycles
//! on one storage key are serialized through a per-key lock so concurrent
//! engines on a multi-threaded runtime cannot interleave partial updates.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, epoch_millis};
use crate::currency::CurrencyCode;
use crate::models::{ConversionRate, HistoryPoint, HistorySeries, PairRate, RangeKind};
use crate::storage::KeyValueStore;

/// Prefix of live snapshot and pair-rate keys.
pub const EXCHANGE_RATE_PREFIX: &str = "exRate";

/// Prefix of history entry keys.
pub const CURRENCY_HISTORY_PREFIX: &str = "exHistory";

/// History points keyed by date.
pub type SeriesByDate = BTreeMap<NaiveDate, HistoryPoint>;

/// `exRate:<BASE>`
#[must_use]
pub fn live_key(base: &CurrencyCode) -> String {
    format!("{EXCHANGE_RATE_PREFIX}:{base}")
}

/// `exHistory:<range>:<BASE>`
#[must_use]
pub fn history_key(range: RangeKind, base: &CurrencyCode) -> String {
    format!("{CURRENCY_HISTORY_PREFIX}:{range}:{base}")
}

/// `exRate:<BASE>-><TARGET>`
#[must_use]
pub fn pair_key(base: &CurrencyCode, target: &CurrencyCode) -> String {
    format!("{EXCHANGE_RATE_PREFIX}:{base}->{target}")
}

/// Persisted history payload: `{ "seriesByDate": { "<date>": point } }`.
#[derive(Serialize, Deserialize)]
struct StoredHistory {
    #[serde(rename = "seriesByDate")]
    series_by_date: SeriesByDate,
}

/// Either the current object shape or the legacy bare-array shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistoryShape {
    Current(StoredHistory),
    Legacy(Vec<HistoryPoint>),
}

/// Cache of live snapshots, history entries and pair rates.
pub struct RateCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RateCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached snapshot for `base` if it is still valid.
    ///
    /// Valid means the stored base matches and `now < nextUpdate`.
    pub fn read_live(&self, base: &CurrencyCode) -> Option<ConversionRate> {
        let rate: ConversionRate = self.read_json(&live_key(base))?;
        if rate.base_currency_code != base.as_str() {
            debug!(%base, stored = %rate.base_currency_code, "Live entry is for another base");
            return None;
        }
        let now_ms = epoch_millis(self.clock.now());
        match rate.next_update_millis() {
            Some(due) if now_ms < due => Some(rate),
            _ => {
                debug!(%base, "Live entry expired");
                None
            }
        }
    }

    /// Overwrites the live entry for `base`.
    pub fn write_live(&self, base: &CurrencyCode, rate: &ConversionRate) {
        self.write_json(&live_key(base), rate);
    }

    /// Reads the history entry, migrating the legacy array shape.
    ///
    /// Absent or corrupt entries yield an empty map. Legacy arrays keep only
    /// points that hold rates.
    pub fn read_history_entry(&self, range: RangeKind, base: &CurrencyCode) -> SeriesByDate {
        let key = history_key(range, base);
        let Some(raw) = self.store.get(&key) else {
            return SeriesByDate::new();
        };
        match serde_json::from_str::<StoredHistoryShape>(&raw) {
            Ok(StoredHistoryShape::Current(stored)) => stored.series_by_date,
            Ok(StoredHistoryShape::Legacy(points)) => {
                debug!(key, points = points.len(), "Migrating legacy history entry");
                points
                    .into_iter()
                    .filter(|point| !point.is_empty())
                    .map(|point| (point.date, point))
                    .collect()
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable history entry");
                SeriesByDate::new()
            }
        }
    }

    /// Overwrites the history entry.
    pub fn write_history_entry(&self, range: RangeKind, base: &CurrencyCode, entry: &SeriesByDate) {
        let payload = StoredHistory {
            series_by_date: entry.clone(),
        };
        self.write_json(&history_key(range, base), &payload);
    }

    /// Applies `update` to the stored history entry under the key's lock and
    /// writes the result back. Returns the written entry.
    pub fn update_history_entry<F>(
        &self,
        range: RangeKind,
        base: &CurrencyCode,
        update: F,
    ) -> SeriesByDate
    where
        F: FnOnce(&mut SeriesByDate),
    {
        let lock = self.lock_for(&history_key(range, base));
        let _guard = lock.lock();
        let mut entry = self.read_history_entry(range, base);
        update(&mut entry);
        self.put_json(
            &history_key(range, base),
            &StoredHistory {
                series_by_date: entry.clone(),
            },
        );
        entry
    }

    /// Keeps only non-empty points whose date is in `expected`.
    #[must_use]
    pub fn prune_to_window(entry: SeriesByDate, expected: &[NaiveDate]) -> SeriesByDate {
        entry
            .into_iter()
            .filter(|(date, point)| expected.contains(date) && !point.is_empty())
            .collect()
    }

    /// Returns the complete series for `expected` if every date is cached
    /// with rates for `base`; otherwise `None`.
    pub fn read_history_series(
        &self,
        range: RangeKind,
        base: &CurrencyCode,
        expected: &[NaiveDate],
    ) -> Option<HistorySeries> {
        let entry = self.read_history_entry(range, base);
        if entry.is_empty() {
            return None;
        }
        expected
            .iter()
            .map(|date| {
                entry
                    .get(date)
                    .filter(|point| point.resolves(*date, base))
                    .cloned()
            })
            .collect()
    }

    /// Returns the stored pair rate regardless of freshness.
    pub fn read_pair(&self, base: &CurrencyCode, target: &CurrencyCode) -> Option<PairRate> {
        self.read_json(&pair_key(base, target))
    }

    pub fn write_pair(&self, base: &CurrencyCode, target: &CurrencyCode, rate: &PairRate) {
        self.write_json(&pair_key(base, target), rate);
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable cache entry");
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        let lock = self.lock_for(key);
        let _guard = lock.lock();
        self.put_json(key, value);
    }

    /// Serializes and stores without taking the key lock.
    fn put_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.store.set(key, &json),
            Err(e) => warn!(key, error = %e, "Failed to serialize cache entry"),
        }
    }
}

//! Wall-clock access and the date/delay arithmetic the schedulers share.
//!
//! Timers always run on tokio's clock; [`Clock`] only answers "what time is
//! it" for cache validity and for turning provider timestamps into delays.

use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::models::RangeKind;

/// Minimum delay before the next scheduled refresh.
pub const MIN_REFRESH_DELAY: Duration = Duration::from_millis(1000);

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a chosen wall time that advances with tokio's clock.
///
/// Under a paused tokio runtime the wall time moves exactly as far as the
/// runtime auto-advances, so cache expiry and timer delays stay consistent.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    wall: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl AnchoredClock {
    #[must_use]
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or(chrono::Duration::zero());
        self.wall + elapsed
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_millis(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis()
}

/// Delay from `now` until `due_ms` (epoch milliseconds), never shorter than
/// [`MIN_REFRESH_DELAY`].
///
/// Returns `fallback` when `due_ms` is absent or the arithmetic overflows.
#[must_use]
pub fn delay_until(due_ms: Option<i64>, now: DateTime<Utc>, fallback: Duration) -> Duration {
    let Some(delta) = due_ms.and_then(|due| due.checked_sub(epoch_millis(now))) else {
        return fallback;
    };
    let delay = u64::try_from(delta).map_or(Duration::ZERO, Duration::from_millis);
    delay.max(MIN_REFRESH_DELAY)
}

/// The UTC calendar date of `now`.
#[must_use]
pub fn utc_today(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// The next midnight UTC strictly after `now`.
#[must_use]
pub fn next_utc_midnight(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let tomorrow = utc_today(now).checked_add_days(Days::new(1))?;
    let midnight = tomorrow.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// The `range.days()` consecutive dates ending at `today`, oldest first.
#[must_use]
pub fn expected_dates(today: NaiveDate, range: RangeKind) -> Vec<NaiveDate> {
    (0..range.days())
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .collect()
}

/// Formats a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a strict `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`RateError::InvalidDate`](crate::RateError::InvalidDate) for
/// anything else.
pub fn parse_date(raw: &str) -> crate::Result<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.len() != 10 {
        return Err(crate::RateError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| crate::RateError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn delay_until_future_timestamp() {
        let now = at("2024-03-06T12:00:00Z");
        let due = epoch_millis(now) + 10_000;
        let delay = delay_until(Some(due), now, Duration::from_secs(60));
        assert_eq!(delay, Duration::from_secs(10));
    }

    #[test]
    fn delay_until_clamps_past_and_near_timestamps() {
        let now = at("2024-03-06T12:00:00Z");
        let fallback = Duration::from_secs(60);
        assert_eq!(
            delay_until(Some(epoch_millis(now) - 5_000), now, fallback),
            MIN_REFRESH_DELAY
        );
        assert_eq!(
            delay_until(Some(epoch_millis(now) + 10), now, fallback),
            MIN_REFRESH_DELAY
        );
    }

    #[test]
    fn delay_until_falls_back_without_timestamp() {
        let now = at("2024-03-06T12:00:00Z");
        let fallback = Duration::from_secs(60);
        assert_eq!(delay_until(None, now, fallback), fallback);
        assert_eq!(delay_until(Some(i64::MIN), now, fallback), fallback);
    }

    #[test]
    fn next_midnight_rolls_over_month_end() {
        let now = at("2024-02-29T23:59:59Z");
        assert_eq!(next_utc_midnight(now).unwrap(), at("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn next_midnight_at_midnight_is_a_full_day_away() {
        let now = at("2024-03-06T00:00:00Z");
        assert_eq!(next_utc_midnight(now).unwrap(), at("2024-03-07T00:00:00Z"));
    }

    #[test]
    fn expected_dates_oldest_first() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let dates: Vec<String> = expected_dates(today, RangeKind::Weekly)
            .into_iter()
            .map(format_date)
            .collect();
        assert_eq!(
            dates,
            [
                "2024-02-25",
                "2024-02-26",
                "2024-02-27",
                "2024-02-28",
                "2024-02-29",
                "2024-03-01",
                "2024-03-02"
            ]
        );
        assert_eq!(expected_dates(today, RangeKind::Daily), vec![today]);
        assert_eq!(expected_dates(today, RangeKind::Monthly).len(), 30);
    }

    #[test]
    fn parse_date_is_strict() {
        assert_eq!(
            parse_date("2024-03-06").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
        );
        assert!(parse_date("2024-3-6").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("06/03/2024").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn anchored_clock_follows_tokio_time() {
        let clock = AnchoredClock::new(at("2024-03-06T12:00:00Z"));
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now(), at("2024-03-06T12:01:30Z"));
    }
}

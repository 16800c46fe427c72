//! Pair-rate caching and fallback in [`Calculator`].

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use ratewatch::RateError;
use ratewatch::calculator::Calculator;
use ratewatch::clock::{Clock, epoch_millis};
use ratewatch::models::PairRate;

use common::{Harness, code};

fn calculator(h: &Harness) -> Calculator {
    Calculator::new(h.fetcher(), h.cache.clone(), h.clock())
}

fn pair(rate: Decimal, expires_at: i64) -> PairRate {
    PairRate { rate, expires_at }
}

fn now_ms(h: &Harness) -> i64 {
    epoch_millis(h.clock.now())
}

#[tokio::test(start_paused = true)]
async fn test_same_currency_is_identity() {
    let h = Harness::new();
    let calc = calculator(&h);

    assert_eq!(assert_ok!(calc.rate("usd", "USD").await), Decimal::ONE);
    assert_eq!(assert_ok!(calc.convert("MYR", "MYR", dec!(12.5)).await), dec!(12.5));
    assert_eq!(h.fetcher.pair_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_currency_is_rejected() {
    let h = Harness::new();
    let calc = calculator(&h);

    let err = assert_err!(calc.rate("USD", "XYZ").await);
    assert!(matches!(err, RateError::UnsupportedCurrency(_)));
    assert_eq!(h.fetcher.pair_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fetched_rate_is_cached_until_expiry() {
    let h = Harness::new();
    let expires_at = now_ms(&h) + 3_600_000;
    h.fetcher.push_pair(pair(dec!(0.9213), expires_at));
    let calc = calculator(&h);

    assert_eq!(assert_ok!(calc.convert("USD", "EUR", dec!(100)).await), dec!(92.13));
    assert_eq!(assert_ok!(calc.rate("USD", "EUR").await), dec!(0.9213));

    assert_eq!(h.fetcher.pair_calls(), 1);
    assert_eq!(
        h.cache.read_pair(&code("USD"), &code("EUR")),
        Some(pair(dec!(0.9213), expires_at))
    );
}

#[tokio::test(start_paused = true)]
async fn test_expired_rate_is_refreshed() {
    let h = Harness::new();
    h.cache
        .write_pair(&code("USD"), &code("EUR"), &pair(dec!(0.90), now_ms(&h) - 1));
    h.fetcher.push_pair(pair(dec!(0.93), now_ms(&h) + 3_600_000));
    let calc = calculator(&h);

    assert_eq!(assert_ok!(calc.rate("USD", "EUR").await), dec!(0.93));
    assert_eq!(h.fetcher.pair_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_falls_back_to_stale_rate() {
    let h = Harness::new();
    h.cache
        .write_pair(&code("USD"), &code("EUR"), &pair(dec!(0.90), now_ms(&h) - 1));
    h.fetcher.push_pair_failure();
    let calc = calculator(&h);

    assert_eq!(assert_ok!(calc.rate("USD", "EUR").await), dec!(0.90));
    assert_eq!(h.fetcher.pair_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_without_cache_is_an_error() {
    let h = Harness::new();
    h.fetcher.push_pair_failure();
    let calc = calculator(&h);

    let err = assert_err!(calc.convert("USD", "EUR", dec!(1)).await);
    assert!(matches!(err, RateError::Provider(_)));
}

//! Real provider integration tests.
//!
//! These tests hit the public historical rates endpoint and require network
//! access. The live endpoint is only exercised when `RATEWATCH_API_KEY` is set.
//! Run with: `cargo test --features integration-tests`

#![cfg(feature = "integration-tests")]

mod common;

use chrono::{Days, Utc};

use ratewatch::config::{DEFAULT_HISTORY_URL, DEFAULT_LIVE_URL, ProviderConfig};
use ratewatch::fetcher::{HttpFetcher, RateFetcher};

use common::code;

fn fetcher(api_key: String) -> HttpFetcher {
    HttpFetcher::new(ProviderConfig {
        live_url: DEFAULT_LIVE_URL.to_string(),
        history_url: DEFAULT_HISTORY_URL.to_string(),
        api_key,
    })
    .expect("Failed to build fetcher")
}

#[tokio::test]
async fn test_fetch_recent_history_point() {
    // Today's snapshot may not be published yet.
    let yesterday = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(1))
        .expect("valid date");

    let point = fetcher(String::new())
        .fetch_history_point(yesterday, &code("USD"))
        .await
        .expect("Failed to fetch history point");

    assert_eq!(point.date, yesterday);
    assert_eq!(point.base_currency_code, "USD");
    assert!(point.conversion_rates.contains_key("EUR"));
}

#[tokio::test]
async fn test_fetch_latest_rates() {
    let Ok(api_key) = std::env::var("RATEWATCH_API_KEY") else {
        return;
    };

    let rate = fetcher(api_key)
        .fetch_live(&code("USD"))
        .await
        .expect("Failed to fetch latest rates");

    assert_eq!(rate.base_currency_code, "USD");
    assert!(rate.rate_for("EUR").is_some());
}

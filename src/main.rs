use std::sync::Arc;

use ratewatch::RateError;
use ratewatch::board::{RateBoard, Selection};
use ratewatch::cache::RateCache;
use ratewatch::clock::{Clock, SystemClock};
use ratewatch::config::fetch_config;
use ratewatch::fetcher::{HttpFetcher, RateFetcher};
use ratewatch::storage::{FileStore, KeyValueStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), RateError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&app_config.storage_dir)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(RateCache::new(store, clock.clone()));
    let fetcher: Arc<dyn RateFetcher> = Arc::new(HttpFetcher::new(app_config.provider.clone())?);

    let board = RateBoard::new(
        fetcher,
        cache,
        clock,
        app_config.polling,
        Selection {
            base: app_config.base_currency.clone(),
            range: app_config.range,
        },
    );

    let mut live = board.live_rates();
    let mut history = board.history_series();

    loop {
        tokio::select! {
            Some(rate) = live.next() => {
                info!(
                    base = %rate.base_currency_code,
                    quotes = rate.conversion_rates.len(),
                    next_update = %rate.time_next_update_utc,
                    "Live rates"
                );
            }
            Some(series) = history.next() => {
                let gaps = series.iter().filter(|point| point.is_empty()).count();
                info!(
                    range = %app_config.range,
                    points = series.len(),
                    gaps,
                    "History series"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

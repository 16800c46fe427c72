//! Application configuration loaded from environment variables.
//!
//! The exchangerate-api key **must** be provided via `RATEWATCH_API_KEY`.
//! Everything else has a default:
//! - `RATEWATCH_LIVE_URL`: latest/pair endpoint root
//! - `RATEWATCH_HISTORY_URL`: per-date template with `{date}` and `{base}`
//! - `RATEWATCH_STORAGE_DIR`: directory of the file-backed cache
//! - `RATEWATCH_POLL_INTERVAL_SECS`: default polling and retry interval
//! - `RATEWATCH_MAX_RETRY_INTERVAL_SECS`: cap for growing retry delays
//! - `RATEWATCH_BASE_CURRENCY`, `RATEWATCH_RANGE`: initial selection

use std::path::PathBuf;
use std::time::Duration;

use crate::currency::CurrencyCode;
use crate::engine::RetryPolicy;
use crate::models::RangeKind;

/// Default latest/pair endpoint root; the API key is appended as a path segment.
pub const DEFAULT_LIVE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Default per-date historical endpoint template.
pub const DEFAULT_HISTORY_URL: &str =
    "https://{date}.currency-api.pages.dev/v1/currencies/{base}.json";

const DEFAULT_STORAGE_DIR: &str = ".ratewatch";

/// Default polling interval, also used for every retry delay.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Attempts after the first for one history date.
pub const MAX_DATE_RETRIES: u32 = 3;

const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub polling: PollingConfig,
    pub storage_dir: PathBuf,
    pub base_currency: CurrencyCode,
    pub range: RangeKind,
}

/// Provider endpoints and credentials.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub live_url: String,
    pub history_url: String,
    pub api_key: String,
}

/// Scheduling and retry settings shared by the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Fallback refresh interval and outer retry delay.
    pub poll_interval: Duration,
    /// Upper bound for retry delays; equal to `poll_interval` for fixed retries.
    pub max_retry_interval: Duration,
    /// Delay between attempts for one history date.
    pub date_retry_delay: Duration,
    /// Retries after the first failed attempt for one history date.
    pub max_date_retries: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retry_interval: DEFAULT_POLL_INTERVAL,
            date_retry_delay: DEFAULT_POLL_INTERVAL,
            max_date_retries: MAX_DATE_RETRIES,
        }
    }
}

impl PollingConfig {
    /// Retry policy for the engines' fetch loops.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.poll_interval, self.max_retry_interval)
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`RateError::Config`](crate::RateError::Config) if the API key is
/// missing or a numeric, currency or range value does not parse.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let api_key = non_empty_var("RATEWATCH_API_KEY").ok_or_else(|| {
        crate::RateError::Config("RATEWATCH_API_KEY is not set".to_string())
    })?;

    let live_url = non_empty_var("RATEWATCH_LIVE_URL").unwrap_or_else(|| DEFAULT_LIVE_URL.to_string());
    let history_url =
        non_empty_var("RATEWATCH_HISTORY_URL").unwrap_or_else(|| DEFAULT_HISTORY_URL.to_string());
    if !history_url.contains("{date}") || !history_url.contains("{base}") {
        return Err(crate::RateError::Config(
            "RATEWATCH_HISTORY_URL must contain {date} and {base}".to_string(),
        ));
    }

    let storage_dir = non_empty_var("RATEWATCH_STORAGE_DIR")
        .map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from);

    let poll_interval = secs_var("RATEWATCH_POLL_INTERVAL_SECS")?.unwrap_or(DEFAULT_POLL_INTERVAL);
    let max_retry_interval = secs_var("RATEWATCH_MAX_RETRY_INTERVAL_SECS")?
        .unwrap_or(poll_interval)
        .max(poll_interval);

    let base_currency = CurrencyCode::supported(
        &non_empty_var("RATEWATCH_BASE_CURRENCY")
            .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string()),
    )
    .map_err(|e| crate::RateError::Config(format!("RATEWATCH_BASE_CURRENCY: {e}")))?;

    let range = match non_empty_var("RATEWATCH_RANGE") {
        Some(raw) => RangeKind::parse(&raw)?,
        None => RangeKind::Weekly,
    };

    Ok(AppConfig {
        provider: ProviderConfig {
            live_url,
            history_url,
            api_key,
        },
        polling: PollingConfig {
            poll_interval,
            max_retry_interval,
            date_retry_delay: poll_interval,
            max_date_retries: MAX_DATE_RETRIES,
        },
        storage_dir,
        base_currency,
        range,
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Parses a positive whole number of seconds.
fn secs_var(name: &str) -> crate::Result<Option<Duration>> {
    let Some(raw) = non_empty_var(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(crate::RateError::Config(format!(
            "{name} must be a positive number of seconds, got {raw:?}"
        ))),
    }
}

//! Single-attempt HTTP round-trips to the rate providers.
//!
//! Each call performs exactly one request and maps the response into a
//! domain type. Retrying is the engines' job.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::Result;
use crate::clock::format_date;
use crate::config::ProviderConfig;
use crate::currency::CurrencyCode;
use crate::models::{
    ConversionRate, HistoryPoint, HistoryResponse, LatestRatesResponse, PairConversionResponse,
    PairRate,
};

/// One network round-trip per logical query.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Latest snapshot of all rates from `base`.
    async fn fetch_live(&self, base: &CurrencyCode) -> Result<ConversionRate>;

    /// Rates from `base` on the UTC calendar day `date`.
    async fn fetch_history_point(&self, date: NaiveDate, base: &CurrencyCode)
    -> Result<HistoryPoint>;

    /// Rate for a single `base -> target` pair.
    async fn fetch_pair(&self, base: &CurrencyCode, target: &CurrencyCode) -> Result<PairRate>;
}

/// [`RateFetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpFetcher {
    /// Builds a fetcher with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::Http`](crate::RateError::Http) if the client
    /// cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ratewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    fn latest_url(&self, base: &CurrencyCode) -> String {
        format!(
            "{}/{}/latest/{base}",
            self.config.live_url.trim_end_matches('/'),
            self.config.api_key
        )
    }

    fn pair_url(&self, base: &CurrencyCode, target: &CurrencyCode) -> String {
        format!(
            "{}/{}/pair/{base}/{target}/1",
            self.config.live_url.trim_end_matches('/'),
            self.config.api_key
        )
    }

    fn history_url(&self, date: NaiveDate, base: &CurrencyCode) -> String {
        self.config
            .history_url
            .replace("{date}", &format_date(date))
            .replace("{base}", &base.to_lowercase())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RateFetcher for HttpFetcher {
    async fn fetch_live(&self, base: &CurrencyCode) -> Result<ConversionRate> {
        let body: LatestRatesResponse = self.get_json(&self.latest_url(base)).await?;
        let rate = body.into_conversion_rate(base)?;
        debug!(
            %base,
            rates = rate.conversion_rates.len(),
            next_update = rate.time_next_update_unix,
            "Fetched latest rates"
        );
        Ok(rate)
    }

    async fn fetch_history_point(
        &self,
        date: NaiveDate,
        base: &CurrencyCode,
    ) -> Result<HistoryPoint> {
        let body: HistoryResponse = self.get_json(&self.history_url(date, base)).await?;
        let point = body.into_history_point(date, base)?;
        debug!(%base, %date, rates = point.conversion_rates.len(), "Fetched history point");
        Ok(point)
    }

    async fn fetch_pair(&self, base: &CurrencyCode, target: &CurrencyCode) -> Result<PairRate> {
        let body: PairConversionResponse = self.get_json(&self.pair_url(base, target)).await?;
        let rate = body.into_pair_rate()?;
        debug!(%base, %target, rate = %rate.rate, "Fetched pair rate");
        Ok(rate)
    }
}

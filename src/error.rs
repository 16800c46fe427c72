//! Crate-level error types.
//!
//! [`RateError`] unifies every error source (configuration, HTTP, JSON,
//! provider payloads, input validation) behind a single enum so callers can
//! match on the variant they care about while still using the `?` operator
//! for easy propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RateError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    /// Configuration could not be loaded or a value failed to parse.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP request failed in transport or returned a non-2xx status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered, but not with a usable success payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// The caller asked for a currency the provider does not serve.
    #[error("unsupported currency code: {0:?}")]
    UnsupportedCurrency(String),

    /// A date was not in `YYYY-MM-DD` form.
    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    /// The durable store could not be opened.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RateError {
    /// Returns `true` for failures a later attempt may recover from.
    ///
    /// These are the errors the polling engines retry; everything else is
    /// a caller or setup mistake.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Json(_) | Self::Provider(_))
    }
}

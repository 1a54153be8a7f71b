//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over data sources (Yahoo Finance,
//! CSV import, synthetic data, in-memory fixtures) so the allocation pipeline
//! never knows where its bars came from.

use crate::domain::{Fundamentals, PriceBar, Ticker};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are per-ticker: the pipeline excludes the failing ticker and keeps
/// going rather than failing the whole request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("symbol not found: {ticker}")]
    NotFound { ticker: String },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("import error: {0}")]
    Import(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
    InMemory,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::YahooFinance => "yahoo_finance",
            Self::CsvImport => "csv_import",
            Self::Synthetic => "synthetic",
            Self::InMemory => "in_memory",
        }
    }
}

/// Trait for market data providers.
///
/// Implementations must be shareable across the fetch worker pool.
/// Retry policy, if any, lives inside the implementation.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Where bars from this provider originate.
    fn source(&self) -> DataSource;

    /// Fetch the `lookback_days` most recent daily bars, chronological.
    fn fetch_history(&self, ticker: &Ticker, lookback_days: usize)
        -> Result<Vec<PriceBar>, DataError>;

    /// Fetch a point-in-time fundamentals snapshot.
    fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, DataError>;
}

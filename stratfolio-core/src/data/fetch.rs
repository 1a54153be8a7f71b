//! Concurrent per-ticker fetch on a bounded worker pool.
//!
//! Each ticker is fetched independently; one failure never cancels the
//! others. Results come back keyed by ticker so downstream ordering does not
//! depend on completion order.

use super::provider::{DataError, MarketDataProvider};
use crate::domain::{Fundamentals, PriceBar, Ticker};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything fetched for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerData {
    pub ticker: Ticker,
    pub bars: Vec<PriceBar>,
    /// `None` when the provider had no fundamentals; the bias is then neutral.
    pub fundamentals: Option<Fundamentals>,
}

pub type FetchResults = BTreeMap<Ticker, Result<TickerData, DataError>>;

/// Fetch history and fundamentals for one ticker.
///
/// A history failure fails the ticker. A fundamentals failure is logged and
/// tolerated.
pub fn fetch_one(
    provider: &dyn MarketDataProvider,
    ticker: &Ticker,
    lookback_days: usize,
) -> Result<TickerData, DataError> {
    tracing::debug!(ticker = %ticker, provider = provider.name(), "fetching history");
    let bars = provider.fetch_history(ticker, lookback_days).map_err(|e| {
        tracing::warn!(ticker = %ticker, error = %e, "history fetch failed");
        e
    })?;

    let fundamentals = match provider.fetch_fundamentals(ticker) {
        Ok(f) => Some(f),
        Err(e) => {
            tracing::warn!(
                ticker = %ticker,
                error = %e,
                "fundamentals unavailable, using neutral bias"
            );
            None
        }
    };

    Ok(TickerData {
        ticker: ticker.clone(),
        bars,
        fundamentals,
    })
}

/// Fetch every ticker on a pool of at most `threads` workers.
pub fn fetch_all(
    provider: &dyn MarketDataProvider,
    tickers: &[Ticker],
    lookback_days: usize,
    threads: usize,
) -> FetchResults {
    let run = || {
        tickers
            .par_iter()
            .map(|t| (t.clone(), fetch_one(provider, t, lookback_days)))
            .collect::<Vec<_>>()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            tracing::warn!(error = %e, "could not build fetch pool, fetching sequentially");
            tickers
                .iter()
                .map(|t| (t.clone(), fetch_one(provider, t, lookback_days)))
                .collect()
        }
    };

    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryProvider;
    use chrono::NaiveDate;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn bars(n: u32) -> Vec<PriceBar> {
        (1..=n)
            .map(|d| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0 + d as f64,
                volume: 1_000,
            })
            .collect()
    }

    #[test]
    fn failure_is_isolated_per_ticker() {
        let provider = InMemoryProvider::new()
            .with_bars(t("AAA"), bars(5))
            .with_failure(
                t("BBB"),
                DataError::NetworkError("connection reset".into()),
            )
            .with_bars(t("CCC"), bars(5));

        let results = fetch_all(&provider, &[t("AAA"), t("BBB"), t("CCC")], 5, 2);
        assert_eq!(results.len(), 3);
        assert!(results[&t("AAA")].is_ok());
        assert!(matches!(results[&t("BBB")], Err(DataError::NetworkError(_))));
        assert!(results[&t("CCC")].is_ok());
    }

    #[test]
    fn missing_fundamentals_is_not_fatal() {
        let provider = InMemoryProvider::new().with_bars(t("AAA"), bars(3));
        let data = fetch_one(&provider, &t("AAA"), 5).unwrap();
        assert_eq!(data.bars.len(), 3);
        assert!(data.fundamentals.is_none());
    }

    #[test]
    fn lookback_trims_history() {
        let provider = InMemoryProvider::new().with_bars(t("AAA"), bars(10));
        let results = fetch_all(&provider, &[t("AAA")], 4, 1);
        let data = results[&t("AAA")].as_ref().unwrap();
        assert_eq!(data.bars.len(), 4);
        assert_eq!(data.bars[3].close, 20.0);
    }
}

//! In-memory provider backed by fixture maps. Used by tests and benches.

use super::provider::{DataError, DataSource, MarketDataProvider};
use crate::domain::bar::tail_window;
use crate::domain::{Fundamentals, PriceBar, Ticker};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct InMemoryProvider {
    bars: HashMap<Ticker, Vec<PriceBar>>,
    fundamentals: HashMap<Ticker, Fundamentals>,
    failures: HashMap<Ticker, DataError>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, ticker: Ticker, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(ticker, bars);
        self
    }

    pub fn with_fundamentals(mut self, ticker: Ticker, fundamentals: Fundamentals) -> Self {
        self.fundamentals.insert(ticker, fundamentals);
        self
    }

    /// Every fetch for `ticker` fails with `error`.
    pub fn with_failure(mut self, ticker: Ticker, error: DataError) -> Self {
        self.failures.insert(ticker, error);
        self
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn source(&self) -> DataSource {
        DataSource::InMemory
    }

    fn fetch_history(
        &self,
        ticker: &Ticker,
        lookback_days: usize,
    ) -> Result<Vec<PriceBar>, DataError> {
        if let Some(err) = self.failures.get(ticker) {
            return Err(err.clone());
        }
        self.bars
            .get(ticker)
            .map(|bars| tail_window(bars.clone(), lookback_days))
            .ok_or_else(|| DataError::NotFound {
                ticker: ticker.to_string(),
            })
    }

    fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, DataError> {
        if let Some(err) = self.failures.get(ticker) {
            return Err(err.clone());
        }
        self.fundamentals
            .get(ticker)
            .cloned()
            .ok_or_else(|| DataError::NotFound {
                ticker: ticker.to_string(),
            })
    }
}

//! PriceBar: one trading day of market data for a ticker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Ticker;

/// Daily OHLCV bar. Histories are chronological, most recent last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Drop void or inconsistent bars from freshly ingested data.
pub fn retain_sane(ticker: &Ticker, bars: &mut Vec<PriceBar>) {
    let before = bars.len();
    bars.retain(PriceBar::is_sane);
    let dropped = before - bars.len();
    if dropped > 0 {
        tracing::warn!(ticker = %ticker, dropped, "discarded malformed bars");
    }
}

/// Sort bars by date and drop duplicate dates (last one wins), keeping the
/// `lookback` most recent.
pub fn tail_window(mut bars: Vec<PriceBar>, lookback: usize) -> Vec<PriceBar> {
    bars.sort_by_key(|b| b.date);
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => deduped.push(bar),
        }
    }
    let skip = deduped.len().saturating_sub(lookback);
    deduped.split_off(skip)
}

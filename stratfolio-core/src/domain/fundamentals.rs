//! Point-in-time fundamentals for a ticker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Descriptive snapshot of a ticker. Every metric is optional because
/// providers (and ETFs) routinely omit some of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub as_of: Option<NaiveDate>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub average_volume: Option<u64>,
}

impl Fundamentals {
    /// Fundamentals carrying only a market capitalization.
    pub fn with_market_cap(market_cap: f64) -> Self {
        Self {
            market_cap: Some(market_cap),
            ..Self::default()
        }
    }

    /// Market cap if present, finite and positive.
    pub fn usable_market_cap(&self) -> Option<f64> {
        self.market_cap.filter(|m| m.is_finite() && *m > 0.0)
    }
}

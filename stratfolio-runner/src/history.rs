//! Portfolio value over the fetched window.
//!
//! Each holding is valued at every date it has a bar; dates where a ticker
//! has no bar contribute nothing for that ticker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stratfolio_core::domain::{PriceBar, Ticker};
use stratfolio_core::AllocationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Units held per ticker: whole shares when computed, otherwise the
/// fractional position `allocated / reference price` (the last close when the
/// allocation carries no price).
pub fn holdings(
    allocation: &AllocationResult,
    histories: &BTreeMap<Ticker, Vec<PriceBar>>,
) -> BTreeMap<Ticker, f64> {
    allocation
        .allocations
        .iter()
        .filter_map(|(ticker, alloc)| {
            if let Some(shares) = alloc.shares {
                return Some((ticker.clone(), shares as f64));
            }
            let price = alloc
                .reference_price
                .or_else(|| histories.get(ticker)?.last().map(|b| b.close))
                .filter(|p| p.is_finite() && *p > 0.0)?;
            Some((ticker.clone(), alloc.allocated.as_dollars() / price))
        })
        .collect()
}

/// Σ close × units per date, ascending by date.
pub fn portfolio_value_history(
    allocation: &AllocationResult,
    histories: &BTreeMap<Ticker, Vec<PriceBar>>,
) -> Vec<ValuePoint> {
    let units = holdings(allocation, histories);
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ticker, qty) in &units {
        let Some(bars) = histories.get(ticker) else {
            continue;
        };
        for bar in bars.iter().filter(|b| b.close.is_finite()) {
            *by_date.entry(bar.date).or_insert(0.0) += bar.close * qty;
        }
    }
    by_date
        .into_iter()
        .map(|(date, value)| ValuePoint { date, value })
        .collect()
}

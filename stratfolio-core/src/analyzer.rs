//! Risk/return analyzer: pure functions from a price history to a score.
//!
//! Score = (mean daily return / sample std of daily returns) × bias factor.
//! The risk-free rate is taken as zero and returns are not annualized; only
//! the ordering of scores across tickers matters to the allocation engine.

use crate::domain::{Fundamentals, PriceBar, Ticker};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Market-cap normalization range: log10(1e9) .. log10(3e12).
const CAP_LOG_LOW: f64 = 9.0;
const CAP_LOG_HIGH: f64 = 12.477_121_254_719_663;

/// Volatility at or below this fraction of `max(|mean|, 1)` counts as zero.
const ZERO_VOL_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("insufficient history for {ticker}: {bars} bar(s), need at least 2")]
    InsufficientHistory { ticker: Ticker, bars: usize },

    #[error("insufficient history for {ticker}: invalid close {close} on {date}")]
    InvalidPrice {
        ticker: Ticker,
        date: NaiveDate,
        close: f64,
    },
}

/// Inclusive bounds for the bias multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for BiasBounds {
    fn default() -> Self {
        Self { min: 0.8, max: 1.2 }
    }
}

impl BiasBounds {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Per-ticker analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerScore {
    pub ticker: Ticker,
    pub bars_used: usize,
    pub mean_return: f64,
    /// Sample standard deviation of daily returns.
    pub volatility: f64,
    pub risk_adjusted: f64,
    pub bias_factor: f64,
    /// `risk_adjusted × bias_factor`; what the allocation engine consumes.
    pub score: f64,
    /// Return over the whole window: last close / first close − 1.
    pub period_return: f64,
    pub last_close: f64,
}

/// r[i] = (close[i] − close[i−1]) / close[i−1].
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1). Zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Mean over volatility; falls back to the mean when volatility is zero.
///
/// Rounding leaves a residue of ~1e-17 in the std of a constant-ratio series,
/// so anything within `ZERO_VOL_TOLERANCE` of zero takes the fallback.
pub fn risk_adjusted_score(mean_return: f64, volatility: f64) -> f64 {
    if volatility > ZERO_VOL_TOLERANCE * mean_return.abs().max(1.0) {
        mean_return / volatility
    } else {
        mean_return
    }
}

/// log10(market cap) mapped from [log10(1e9), log10(3e12)] onto [−1, 1].
/// Missing or unusable market cap maps to 0.
pub fn market_cap_component(fundamentals: Option<&Fundamentals>) -> f64 {
    let Some(cap) = fundamentals.and_then(Fundamentals::usable_market_cap) else {
        return 0.0;
    };
    let t = (cap.log10() - CAP_LOG_LOW) / (CAP_LOG_HIGH - CAP_LOG_LOW);
    (2.0 * t - 1.0).clamp(-1.0, 1.0)
}

/// Latest volume over the window's average volume, minus one, clamped to
/// [−1, 1]. Zero average volume maps to 0.
pub fn volume_component(bars: &[PriceBar]) -> f64 {
    let Some(latest) = bars.last() else {
        return 0.0;
    };
    let avg = bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64;
    if avg <= 0.0 {
        return 0.0;
    }
    (latest.volume as f64 / avg - 1.0).clamp(-1.0, 1.0)
}

/// Combined market-cap and volume-trend multiplier in `[bounds.min, bounds.max]`.
pub fn bias_factor(
    bars: &[PriceBar],
    fundamentals: Option<&Fundamentals>,
    bounds: BiasBounds,
) -> f64 {
    let combined =
        (0.5 * market_cap_component(fundamentals) + 0.5 * volume_component(bars)).clamp(-1.0, 1.0);
    let half_range = (bounds.max - bounds.min) / 2.0;
    (bounds.midpoint() + combined * half_range).clamp(bounds.min, bounds.max)
}

/// Score one ticker's history. `bars` must be chronological.
///
/// The bias multiplies the risk-adjusted figure, so for a losing ticker a
/// bias above 1 pushes the score further below zero: a large, heavily traded
/// name with negative returns ranks below a small one with the same returns.
pub fn analyze(
    ticker: &Ticker,
    bars: &[PriceBar],
    fundamentals: Option<&Fundamentals>,
    bounds: BiasBounds,
) -> Result<TickerScore, AnalysisError> {
    if bars.len() < 2 {
        return Err(AnalysisError::InsufficientHistory {
            ticker: ticker.clone(),
            bars: bars.len(),
        });
    }
    if let Some(bad) = bars.iter().find(|b| !(b.close.is_finite() && b.close > 0.0)) {
        return Err(AnalysisError::InvalidPrice {
            ticker: ticker.clone(),
            date: bad.date,
            close: bad.close,
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let returns = daily_returns(&closes);
    let mean_return = mean(&returns);
    let volatility = sample_std_dev(&returns);
    let risk_adjusted = risk_adjusted_score(mean_return, volatility);
    let bias = bias_factor(bars, fundamentals, bounds);

    let first = closes[0];
    let last = closes[closes.len() - 1];

    let score = TickerScore {
        ticker: ticker.clone(),
        bars_used: bars.len(),
        mean_return,
        volatility,
        risk_adjusted,
        bias_factor: bias,
        score: risk_adjusted * bias,
        period_return: last / first - 1.0,
        last_close: last,
    };
    tracing::debug!(
        ticker = %ticker,
        mean = score.mean_return,
        vol = score.volatility,
        bias = score.bias_factor,
        score = score.score,
        "scored"
    );
    Ok(score)
}

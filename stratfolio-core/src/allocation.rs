//! Allocation engine: scores in, floored weights and cent-exact amounts out.
//!
//! Pipeline per request:
//! 1. partition tickers into eligible (finite score) and excluded
//! 2. shift scores so the minimum is at least epsilon
//! 3. normalize (softmax or proportional) into raw weights
//! 4. give every eligible ticker the floor and share out the remainder by
//!    raw weight
//! 5. convert weights to whole cents, floored
//! 6. optionally convert cents to whole shares at a reference price
//!
//! Invariant: Σ invested + uninvested cash == total capital, in cents.

use crate::analyzer::AnalysisError;
use crate::config::{AllocatorConfig, Normalization};
use crate::data::DataError;
use crate::domain::{Cents, Ticker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Slack for floating-point comparisons on weights and fractional cents.
const WEIGHT_TOLERANCE: f64 = 1e-12;
const CENT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("capital {capital} is below the minimum of {minimum}")]
    BelowMinimumCapital { capital: Cents, minimum: Cents },

    #[error("invalid capital amount: {0}")]
    InvalidCapital(f64),

    #[error("no eligible tickers ({excluded} excluded)")]
    NoEligibleTickers { excluded: usize },

    #[error("floor {floor} × {tickers} tickers exceeds 100%")]
    AllocationInfeasible { floor: f64, tickers: usize },

    #[error("missing or invalid reference price for {ticker}")]
    MissingReferencePrice { ticker: Ticker },
}

/// Why a ticker got no allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    InsufficientHistory { bars: usize },
    InvalidPrice { detail: String },
    NonFiniteScore,
    DataProvider { message: String },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientHistory { bars } => {
                write!(f, "insufficient history ({bars} bar(s))")
            }
            Self::InvalidPrice { detail } => write!(f, "insufficient history: {detail}"),
            Self::NonFiniteScore => write!(f, "score is not a finite number"),
            Self::DataProvider { message } => write!(f, "data provider error: {message}"),
        }
    }
}

impl From<&AnalysisError> for ExclusionReason {
    fn from(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::InsufficientHistory { bars, .. } => {
                Self::InsufficientHistory { bars: *bars }
            }
            AnalysisError::InvalidPrice { date, close, .. } => Self::InvalidPrice {
                detail: format!("invalid close {close} on {date}"),
            },
        }
    }
}

impl From<&DataError> for ExclusionReason {
    fn from(err: &DataError) -> Self {
        Self::DataProvider {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub ticker: Ticker,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerAllocation {
    pub weight: f64,
    /// weight × capital, floored to the cent.
    pub allocated: Cents,
    pub shares: Option<u64>,
    pub reference_price: Option<f64>,
    /// shares × price floored to the cent, or `allocated` without shares.
    pub invested: Cents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub allocations: BTreeMap<Ticker, TickerAllocation>,
    pub exclusions: Vec<Exclusion>,
    pub total_capital: Cents,
    /// Cents lost to flooring weight × capital.
    pub rounding_remainder: Cents,
    /// Everything not invested: rounding remainder plus share leftovers.
    pub uninvested_cash: Cents,
}

impl AllocationResult {
    pub fn total_allocated(&self) -> Cents {
        self.allocations.values().map(|a| a.allocated).sum()
    }

    pub fn total_invested(&self) -> Cents {
        self.allocations.values().map(|a| a.invested).sum()
    }

    pub fn weight_sum(&self) -> f64 {
        self.allocations.values().map(|a| a.weight).sum()
    }

    pub fn weight(&self, ticker: &Ticker) -> Option<f64> {
        self.allocations.get(ticker).map(|a| a.weight)
    }

    pub fn is_excluded(&self, ticker: &Ticker) -> bool {
        self.exclusions.iter().any(|e| &e.ticker == ticker)
    }

    /// Σ invested + uninvested == capital.
    pub fn is_balanced(&self) -> bool {
        self.total_invested() + self.uninvested_cash == self.total_capital
    }
}

/// Parse and check a dollar capital amount against the minimum.
pub fn validate_capital(capital: f64, minimum: Cents) -> Result<Cents, AllocationError> {
    let cents = Cents::from_dollars(capital).ok_or(AllocationError::InvalidCapital(capital))?;
    if cents < minimum {
        return Err(AllocationError::BelowMinimumCapital {
            capital: cents,
            minimum,
        });
    }
    Ok(cents)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationEngine {
    floor_fraction: f64,
    normalization: Normalization,
    temperature: f64,
    epsilon: f64,
}

impl AllocationEngine {
    pub fn new(config: &AllocatorConfig) -> Self {
        Self {
            floor_fraction: config.floor_fraction,
            normalization: config.normalization,
            temperature: config.temperature,
            epsilon: config.epsilon,
        }
    }

    pub fn floor_fraction(&self) -> f64 {
        self.floor_fraction
    }

    /// Raw weights before the floor. Sum to 1; monotone in each score.
    pub fn normalize(&self, scores: &[f64]) -> Vec<f64> {
        if scores.is_empty() {
            return Vec::new();
        }
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let shift = (self.epsilon - min).max(0.0);
        let shifted: Vec<f64> = scores.iter().map(|s| s + shift).collect();

        let raw: Vec<f64> = match self.normalization {
            Normalization::Softmax => {
                let max = shifted.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                shifted
                    .iter()
                    .map(|s| ((s - max) / self.temperature).exp())
                    .collect()
            }
            Normalization::Proportional => shifted,
        };
        let total: f64 = raw.iter().sum();
        raw.iter().map(|r| r / total).collect()
    }

    /// Final weights: floor for everyone, remainder by raw weight.
    pub fn weights(&self, scores: &[f64]) -> Result<Vec<f64>, AllocationError> {
        let n = scores.len();
        if n == 0 {
            return Err(AllocationError::NoEligibleTickers { excluded: 0 });
        }
        if self.floor_fraction * n as f64 > 1.0 + WEIGHT_TOLERANCE {
            return Err(AllocationError::AllocationInfeasible {
                floor: self.floor_fraction,
                tickers: n,
            });
        }
        if n == 1 {
            return Ok(vec![1.0]);
        }
        let remainder = (1.0 - self.floor_fraction * n as f64).max(0.0);
        Ok(self
            .normalize(scores)
            .into_iter()
            .map(|raw| self.floor_fraction + remainder * raw)
            .collect())
    }

    /// Allocate `capital` across the tickers with a usable score.
    ///
    /// With `prices`, each amount is converted to whole shares and the
    /// leftover folds into uninvested cash; every eligible ticker must then
    /// have a positive finite price.
    pub fn allocate(
        &self,
        scores: &BTreeMap<Ticker, Result<f64, ExclusionReason>>,
        capital: Cents,
        prices: Option<&BTreeMap<Ticker, f64>>,
    ) -> Result<AllocationResult, AllocationError> {
        let mut eligible: Vec<(&Ticker, f64)> = Vec::new();
        let mut exclusions = Vec::new();
        for (ticker, score) in scores {
            match score {
                Ok(s) if s.is_finite() => eligible.push((ticker, *s)),
                Ok(_) => exclusions.push(Exclusion {
                    ticker: ticker.clone(),
                    reason: ExclusionReason::NonFiniteScore,
                }),
                Err(reason) => exclusions.push(Exclusion {
                    ticker: ticker.clone(),
                    reason: reason.clone(),
                }),
            }
        }
        for e in &exclusions {
            tracing::warn!(ticker = %e.ticker, reason = %e.reason, "ticker excluded");
        }
        if eligible.is_empty() {
            return Err(AllocationError::NoEligibleTickers {
                excluded: exclusions.len(),
            });
        }

        let raw_scores: Vec<f64> = eligible.iter().map(|(_, s)| *s).collect();
        let weights = self.weights(&raw_scores)?;
        let amounts = cents_for_weights(&weights, capital);

        let mut allocations = BTreeMap::new();
        for ((ticker, _), (weight, allocated)) in
            eligible.iter().zip(weights.into_iter().zip(amounts))
        {
            let (shares, reference_price, invested) = match prices {
                Some(prices) => {
                    let price = prices
                        .get(*ticker)
                        .copied()
                        .filter(|p| p.is_finite() && *p > 0.0)
                        .ok_or_else(|| AllocationError::MissingReferencePrice {
                            ticker: (*ticker).clone(),
                        })?;
                    let (shares, invested) = whole_shares(allocated, price);
                    (Some(shares), Some(price), invested)
                }
                None => (None, None, allocated),
            };
            allocations.insert(
                (*ticker).clone(),
                TickerAllocation {
                    weight,
                    allocated,
                    shares,
                    reference_price,
                    invested,
                },
            );
        }

        let allocated_total: Cents = allocations.values().map(|a| a.allocated).sum();
        let invested_total: Cents = allocations.values().map(|a| a.invested).sum();
        let result = AllocationResult {
            allocations,
            exclusions,
            total_capital: capital,
            rounding_remainder: capital.saturating_sub(allocated_total),
            uninvested_cash: capital.saturating_sub(invested_total),
        };

        tracing::info!(
            capital = %capital,
            tickers = result.allocations.len(),
            excluded = result.exclusions.len(),
            uninvested = %result.uninvested_cash,
            "allocation complete"
        );
        Ok(result)
    }
}

/// floor(weight × capital) per ticker, never summing above `capital`.
fn cents_for_weights(weights: &[f64], capital: Cents) -> Vec<Cents> {
    let mut amounts: Vec<u64> = weights
        .iter()
        .map(|w| {
            let c = (w * capital.0 as f64).floor();
            if c <= 0.0 {
                0
            } else {
                (c as u64).min(capital.0)
            }
        })
        .collect();

    // Weights can sum to 1 + ulp; shave the overshoot off the largest amount.
    let mut total: u64 = amounts.iter().sum();
    while total > capital.0 {
        if let Some(largest) = amounts
            .iter_mut()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
            .map(|(_, a)| a)
        {
            *largest -= 1;
            total -= 1;
        } else {
            break;
        }
    }
    amounts.into_iter().map(Cents).collect()
}

/// Whole shares affordable with `allocated` at `price`, and their cost.
fn whole_shares(allocated: Cents, price: f64) -> (u64, Cents) {
    let price_cents = price * 100.0;
    let mut shares = (allocated.0 as f64 / price_cents + CENT_TOLERANCE).floor().max(0.0) as u64;
    while shares > 0 && shares as f64 * price_cents > allocated.0 as f64 + CENT_TOLERANCE {
        shares -= 1;
    }
    let cost = (shares as f64 * price_cents + CENT_TOLERANCE).floor().max(0.0) as u64;
    (shares, Cents(cost.min(allocated.0)))
}

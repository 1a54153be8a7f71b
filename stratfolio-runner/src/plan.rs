//! Allocation request orchestration.
//!
//! validate capital → resolve strategies → fetch concurrently → score →
//! allocate → value history. Request-level failures abort with a
//! `PlanError`; per-ticker failures become exclusions in the report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use stratfolio_core::data::{fetch_all, DataSource, MarketDataProvider};
use stratfolio_core::domain::{Cents, Fundamentals, PriceBar, Ticker};
use stratfolio_core::{
    analyze, validate_capital, AllocationEngine, AllocationError, AllocationResult,
    AllocatorConfig, BiasBounds, CatalogError, ConfigError, ExclusionReason, StrategyCatalog,
    TickerScore,
};

use crate::history::{portfolio_value_history, ValuePoint};

/// Current report schema version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("strategy error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("failed to fingerprint request: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Total capital in dollars.
    pub capital: f64,
    /// Strategy names as selected by the user.
    pub strategies: Vec<String>,
}

impl AllocationRequest {
    pub fn new<S: Into<String>>(capital: f64, strategies: impl IntoIterator<Item = S>) -> Self {
        Self {
            capital,
            strategies: strategies.into_iter().map(Into::into).collect(),
        }
    }
}

/// Everything the presentation layer needs for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub schema_version: u32,
    /// BLAKE3 over tickers, scores, capital and config.
    pub fingerprint: String,
    pub capital: Cents,
    pub strategies: Vec<String>,
    /// Resolved tickers in first-occurrence order.
    pub tickers: Vec<Ticker>,
    pub provider: String,
    pub source: DataSource,
    pub config: AllocatorConfig,
    pub allocation: AllocationResult,
    pub scores: BTreeMap<Ticker, TickerScore>,
    pub history: BTreeMap<Ticker, Vec<PriceBar>>,
    pub fundamentals: BTreeMap<Ticker, Fundamentals>,
    pub value_history: Vec<ValuePoint>,
}

impl PortfolioReport {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    tickers: Vec<&'a Ticker>,
    scores: &'a BTreeMap<Ticker, Result<f64, ExclusionReason>>,
    capital: Cents,
    config: &'a AllocatorConfig,
}

/// Content hash of a scored request. Identical tickers, scores, capital and
/// config always give the same fingerprint.
pub fn request_fingerprint(
    scores: &BTreeMap<Ticker, Result<f64, ExclusionReason>>,
    capital: Cents,
    config: &AllocatorConfig,
) -> Result<String, serde_json::Error> {
    let input = FingerprintInput {
        tickers: scores.keys().collect(),
        scores,
        capital,
        config,
    };
    let json = serde_json::to_vec(&input)?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// Run one allocation request end to end.
pub fn run_allocation(
    request: &AllocationRequest,
    catalog: &StrategyCatalog,
    provider: &dyn MarketDataProvider,
    config: &AllocatorConfig,
) -> Result<PortfolioReport, PlanError> {
    config.validate()?;
    let capital = validate_capital(request.capital, config.min_capital_cents())?;
    let tickers = catalog.resolve(request.strategies.as_slice(), config.max_strategies)?;

    let mut strategies: Vec<String> = Vec::new();
    for name in request.strategies.iter().map(|s| s.trim().to_string()) {
        if !strategies.contains(&name) {
            strategies.push(name);
        }
    }

    tracing::info!(
        capital = %capital,
        strategies = ?strategies,
        tickers = tickers.len(),
        provider = provider.name(),
        "starting allocation"
    );

    let fetched = fetch_all(
        provider,
        &tickers,
        config.lookback_days,
        config.fetch_threads,
    );

    let bounds = BiasBounds {
        min: config.bias_min,
        max: config.bias_max,
    };
    let mut raw_scores: BTreeMap<Ticker, Result<f64, ExclusionReason>> = BTreeMap::new();
    let mut scores = BTreeMap::new();
    let mut history = BTreeMap::new();
    let mut fundamentals = BTreeMap::new();

    for (ticker, result) in fetched {
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                raw_scores.insert(ticker, Err(ExclusionReason::from(&e)));
                continue;
            }
        };
        match analyze(&ticker, &data.bars, data.fundamentals.as_ref(), bounds) {
            Ok(score) => {
                raw_scores.insert(ticker.clone(), Ok(score.score));
                scores.insert(ticker.clone(), score);
            }
            Err(e) => {
                raw_scores.insert(ticker.clone(), Err(ExclusionReason::from(&e)));
            }
        }
        if let Some(f) = data.fundamentals {
            fundamentals.insert(ticker.clone(), f);
        }
        history.insert(ticker, data.bars);
    }

    let prices: Option<BTreeMap<Ticker, f64>> = config.compute_shares.then(|| {
        scores
            .iter()
            .map(|(t, s): (&Ticker, &TickerScore)| (t.clone(), s.last_close))
            .collect()
    });

    let engine = AllocationEngine::new(config);
    let allocation = engine.allocate(&raw_scores, capital, prices.as_ref())?;
    let value_history = portfolio_value_history(&allocation, &history);
    let fingerprint = request_fingerprint(&raw_scores, capital, config)?;

    Ok(PortfolioReport {
        schema_version: SCHEMA_VERSION,
        fingerprint,
        capital,
        strategies,
        tickers,
        provider: provider.name().to_string(),
        source: provider.source(),
        config: config.clone(),
        allocation,
        scores,
        history,
        fundamentals,
        value_history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let config = AllocatorConfig::default();
        let scores: BTreeMap<Ticker, Result<f64, ExclusionReason>> =
            [(t("AAA"), Ok(0.4)), (t("BBB"), Ok(-0.1))].into();
        let a = request_fingerprint(&scores, Cents(600_000), &config).unwrap();
        let b = request_fingerprint(&scores, Cents(600_000), &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let c = request_fingerprint(&scores, Cents(600_001), &config).unwrap();
        assert_ne!(a, c);

        let looser = AllocatorConfig {
            floor_fraction: 0.1,
            ..config.clone()
        };
        assert_ne!(a, request_fingerprint(&scores, Cents(600_000), &looser).unwrap());
    }

    #[test]
    fn request_builder_collects_names() {
        let req = AllocationRequest::new(6000.0, ["Growth Investing", "Value Investing"]);
        assert_eq!(req.strategies.len(), 2);
        assert_eq!(req.capital, 6000.0);
    }
}

//! Stratfolio Core: domain types, market data, scoring and allocation.
//!
//! This crate contains everything needed to turn a strategy selection and a
//! capital amount into an allocation:
//! - Domain types (tickers, price bars, fundamentals, whole-cent money)
//! - Strategy catalog (named baskets of tickers)
//! - Market data providers (Yahoo Finance, CSV, synthetic, in-memory) and a
//!   bounded concurrent fetch
//! - Risk/return analyzer (Sharpe-style score with a market-cap/volume bias)
//! - Allocation engine (floored weights, cent-exact amounts, whole shares)
//! - Allocator configuration

pub mod allocation;
pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod data;
pub mod domain;

pub use allocation::{
    validate_capital, AllocationEngine, AllocationError, AllocationResult, Exclusion,
    ExclusionReason, TickerAllocation,
};
pub use analyzer::{analyze, AnalysisError, BiasBounds, TickerScore};
pub use catalog::{CatalogError, StrategyCatalog};
pub use config::{AllocatorConfig, ConfigError, Normalization};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: request-scoped types cross the fetch pool freely.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::Fundamentals>();
        require_sync::<domain::Fundamentals>();
        require_send::<domain::Ticker>();
        require_sync::<domain::Ticker>();

        require_send::<data::TickerData>();
        require_sync::<data::TickerData>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();

        require_send::<TickerScore>();
        require_sync::<TickerScore>();
        require_send::<AllocationResult>();
        require_sync::<AllocationResult>();
        require_send::<StrategyCatalog>();
        require_sync::<StrategyCatalog>();

        // Providers are shared by reference across workers.
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
        require_send::<data::InMemoryProvider>();
        require_sync::<data::InMemoryProvider>();
    }

    #[test]
    fn reference_catalog_fits_default_floor() {
        let config = AllocatorConfig::default();
        let catalog = StrategyCatalog::reference();
        let names: Vec<&str> = catalog.names().take(config.max_strategies).collect();
        let tickers = catalog.resolve(&names[..], config.max_strategies).unwrap();
        assert!(config.floor_fraction * tickers.len() as f64 <= 1.0);
    }
}

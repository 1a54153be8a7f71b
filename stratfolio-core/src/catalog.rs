//! Strategy catalog: named baskets of tickers.
//!
//! The catalog is an immutable lookup table. `resolve` turns a user's
//! strategy selection into the deduplicated ticker set to fetch.

use crate::domain::{Ticker, TickerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("no strategy selected")]
    NoStrategySelected,

    #[error("too many strategies selected: {selected} (max {max})")]
    TooManyStrategies { selected: usize, max: usize },

    #[error("strategy '{strategy}' has no tickers")]
    EmptyStrategy { strategy: String },

    #[error("invalid ticker in strategy '{strategy}': {source}")]
    InvalidTicker {
        strategy: String,
        #[source]
        source: TickerError,
    },

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

/// On-disk form: `[strategies] "Name" = ["T1", "T2"]`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    strategies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyCatalog {
    strategies: BTreeMap<String, Vec<Ticker>>,
}

const REFERENCE: &[(&str, &[&str])] = &[
    ("Ethical Investing", &["AAPL", "ADBE", "NSRGY"]),
    ("Growth Investing", &["TSLA", "NVDA", "AMZN"]),
    ("Index Investing", &["VTI", "IXUS", "ILTB"]),
    ("Quality Investing", &["MSFT", "JNJ", "V"]),
    ("Value Investing", &["BRK-B", "JPM", "PG"]),
];

impl StrategyCatalog {
    /// The built-in five-strategy catalog.
    pub fn reference() -> Self {
        let strategies = REFERENCE
            .iter()
            .map(|(name, symbols)| {
                let tickers = symbols
                    .iter()
                    .filter_map(|s| Ticker::parse(s).ok())
                    .collect();
                (name.to_string(), tickers)
            })
            .collect();
        Self { strategies }
    }

    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        let mut strategies = BTreeMap::new();
        for (name, symbols) in file.strategies {
            if symbols.is_empty() {
                return Err(CatalogError::EmptyStrategy { strategy: name });
            }
            let mut tickers: Vec<Ticker> = Vec::with_capacity(symbols.len());
            for symbol in &symbols {
                let ticker =
                    Ticker::parse(symbol).map_err(|source| CatalogError::InvalidTicker {
                        strategy: name.clone(),
                        source,
                    })?;
                if !tickers.contains(&ticker) {
                    tickers.push(ticker);
                }
            }
            strategies.insert(name, tickers);
        }
        Ok(Self { strategies })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Strategy names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn tickers(&self, strategy: &str) -> Option<&[Ticker]> {
        self.strategies.get(strategy).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Union of the tickers of the selected strategies, each ticker once, in
    /// first-occurrence order. Repeating a strategy name counts once.
    pub fn resolve<S: AsRef<str>>(
        &self,
        selected: &[S],
        max_selected: usize,
    ) -> Result<Vec<Ticker>, CatalogError> {
        let mut names: Vec<&str> = Vec::with_capacity(selected.len());
        for name in selected.iter().map(|s| s.as_ref().trim()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        if names.is_empty() {
            return Err(CatalogError::NoStrategySelected);
        }
        if names.len() > max_selected {
            return Err(CatalogError::TooManyStrategies {
                selected: names.len(),
                max: max_selected,
            });
        }

        let mut tickers: Vec<Ticker> = Vec::new();
        for name in names {
            let members = self
                .tickers(name)
                .ok_or_else(|| CatalogError::UnknownStrategy(name.to_string()))?;
            for ticker in members {
                if !tickers.contains(ticker) {
                    tickers.push(ticker.clone());
                }
            }
        }
        Ok(tickers)
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(tickers: &[Ticker]) -> Vec<&str> {
        tickers.iter().map(Ticker::as_str).collect()
    }

    #[test]
    fn reference_has_five_strategies_of_three() {
        let catalog = StrategyCatalog::reference();
        assert_eq!(catalog.len(), 5);
        for name in catalog.names() {
            assert_eq!(catalog.tickers(name).unwrap().len(), 3, "{name}");
        }
        assert_eq!(
            symbols(catalog.tickers("Value Investing").unwrap()),
            ["BRK-B", "JPM", "PG"]
        );
    }

    #[test]
    fn resolve_single() {
        let catalog = StrategyCatalog::reference();
        let tickers = catalog.resolve(&["Growth Investing"], 2).unwrap();
        assert_eq!(symbols(&tickers), ["TSLA", "NVDA", "AMZN"]);
    }

    #[test]
    fn resolve_union_preserves_first_occurrence() {
        let catalog = StrategyCatalog::from_toml(
            r#"
            [strategies]
            "Tech" = ["AAPL", "MSFT", "NVDA"]
            "Quality" = ["MSFT", "JNJ", "V"]
            "#,
        )
        .unwrap();
        let tickers = catalog.resolve(&["Tech", "Quality"], 2).unwrap();
        assert_eq!(symbols(&tickers), ["AAPL", "MSFT", "NVDA", "JNJ", "V"]);
    }

    #[test]
    fn duplicate_name_counts_once() {
        let catalog = StrategyCatalog::reference();
        let tickers = catalog
            .resolve(&["Index Investing", "Index Investing", "Index Investing"], 2)
            .unwrap();
        assert_eq!(tickers.len(), 3);
    }

    #[test]
    fn resolve_errors() {
        let catalog = StrategyCatalog::reference();
        let none: [&str; 0] = [];
        assert!(matches!(
            catalog.resolve(&none, 2),
            Err(CatalogError::NoStrategySelected)
        ));
        assert!(matches!(
            catalog.resolve(&["Momentum Investing"], 2),
            Err(CatalogError::UnknownStrategy(name)) if name == "Momentum Investing"
        ));
        assert!(matches!(
            catalog.resolve(
                &["Growth Investing", "Value Investing", "Index Investing"],
                2
            ),
            Err(CatalogError::TooManyStrategies { selected: 3, max: 2 })
        ));
    }

    #[test]
    fn from_toml_rejects_bad_tickers() {
        let err = StrategyCatalog::from_toml(
            r#"
            [strategies]
            "Bad" = ["AAPL", "NOT A TICKER"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTicker { .. }));

        let err = StrategyCatalog::from_toml("[strategies]\n\"Empty\" = []\n").unwrap_err();
        assert!(matches!(err, CatalogError::EmptyStrategy { .. }));
    }
}

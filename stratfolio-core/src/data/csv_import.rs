//! CSV directory provider for offline use.
//!
//! Layout:
//! - `<dir>/<TICKER>.csv` with header `date,open,high,low,close,volume`
//!   (dates as `YYYY-MM-DD`, any order; the provider sorts them)
//! - optional `<dir>/fundamentals.csv` with header
//!   `ticker,market_cap,pe_ratio,dividend_yield,fifty_two_week_high,fifty_two_week_low,average_volume`
//!   (empty cells mean "unknown")

use super::provider::{DataError, DataSource, MarketDataProvider};
use crate::domain::bar::{retain_sane, tail_window};
use crate::domain::{Fundamentals, PriceBar, Ticker};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvBar {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct CsvFundamentals {
    ticker: String,
    market_cap: Option<f64>,
    pe_ratio: Option<f64>,
    dividend_yield: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    average_volume: Option<f64>,
}

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn bars_path(&self, ticker: &Ticker) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    fn read_bars(&self, ticker: &Ticker) -> Result<Vec<PriceBar>, DataError> {
        let path = self.bars_path(ticker);
        if !path.exists() {
            return Err(DataError::NotFound {
                ticker: ticker.to_string(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| DataError::Import(format!("open {}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for (line, row) in reader.deserialize::<CsvBar>().enumerate() {
            let row = row.map_err(|e| {
                DataError::Import(format!("{} row {}: {e}", path.display(), line + 2))
            })?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                DataError::Import(format!(
                    "{} row {}: bad date '{}': {e}",
                    path.display(),
                    line + 2,
                    row.date
                ))
            })?;
            bars.push(PriceBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: if row.volume.is_finite() && row.volume > 0.0 {
                    row.volume as u64
                } else {
                    0
                },
            });
        }
        retain_sane(ticker, &mut bars);
        Ok(bars)
    }
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn fetch_history(
        &self,
        ticker: &Ticker,
        lookback_days: usize,
    ) -> Result<Vec<PriceBar>, DataError> {
        let bars = self.read_bars(ticker)?;
        Ok(tail_window(bars, lookback_days))
    }

    fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, DataError> {
        let path = self.dir.join("fundamentals.csv");
        let not_found = || DataError::NotFound {
            ticker: ticker.to_string(),
        };
        if !path.exists() {
            return Err(not_found());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| DataError::Import(format!("open {}: {e}", path.display())))?;

        for row in reader.deserialize::<CsvFundamentals>() {
            let row = row.map_err(|e| DataError::Import(format!("{}: {e}", path.display())))?;
            if !row.ticker.trim().eq_ignore_ascii_case(ticker.as_str()) {
                continue;
            }
            return Ok(Fundamentals {
                as_of: None,
                market_cap: row.market_cap,
                pe_ratio: row.pe_ratio,
                dividend_yield: row.dividend_yield,
                fifty_two_week_high: row.fifty_two_week_high,
                fifty_two_week_low: row.fifty_two_week_low,
                average_volume: row.average_volume.filter(|v| *v >= 0.0).map(|v| v as u64),
            });
        }
        Err(not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn reads_sorted_tail_window() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "SPY.csv",
            "date,open,high,low,close,volume\n\
             2024-01-04,102,103,101,102.5,1200\n\
             2024-01-02,100,101,99,100.5,1000\n\
             2024-01-03,101,102,100,101.5,1100\n",
        );
        let provider = CsvProvider::new(dir.path());
        let bars = provider
            .fetch_history(&Ticker::parse("spy").unwrap(), 2)
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 101.5);
        assert_eq!(bars[1].close, 102.5);
    }

    #[test]
    fn malformed_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "SPY.csv",
            "date,open,high,low,close,volume\n\
             2024-01-02,100,101,99,100.5,1000\n\
             2024-01-03,101,102,100,0,1100\n\
             2024-01-04,102,98,101,102.5,1200\n\
             2024-01-05,103,104,102,103.5,1300\n",
        );
        let provider = CsvProvider::new(dir.path());
        let bars = provider
            .fetch_history(&Ticker::parse("SPY").unwrap(), 5)
            .unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![100.5, 103.5]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(dir.path());
        let err = provider
            .fetch_history(&Ticker::parse("QQQ").unwrap(), 5)
            .unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    #[test]
    fn bad_date_is_import_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "SPY.csv",
            "date,open,high,low,close,volume\n01/02/2024,100,101,99,100.5,1000\n",
        );
        let provider = CsvProvider::new(dir.path());
        let err = provider
            .fetch_history(&Ticker::parse("SPY").unwrap(), 5)
            .unwrap_err();
        assert!(matches!(err, DataError::Import(_)));
    }

    #[test]
    fn reads_fundamentals_with_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "fundamentals.csv",
            "ticker,market_cap,pe_ratio,dividend_yield,fifty_two_week_high,fifty_two_week_low,average_volume\n\
             VTI,,,0.013,250.1,200.2,3500000\n\
             AAPL,2900000000000,31.2,0.005,199.6,164.1,52000000\n",
        );
        let provider = CsvProvider::new(dir.path());
        let vti = provider
            .fetch_fundamentals(&Ticker::parse("VTI").unwrap())
            .unwrap();
        assert_eq!(vti.market_cap, None);
        assert_eq!(vti.dividend_yield, Some(0.013));
        let aapl = provider
            .fetch_fundamentals(&Ticker::parse("AAPL").unwrap())
            .unwrap();
        assert_eq!(aapl.market_cap, Some(2.9e12));
        assert!(provider
            .fetch_fundamentals(&Ticker::parse("MSFT").unwrap())
            .is_err());
    }
}

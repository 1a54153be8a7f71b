//! Synthetic data provider for demos and offline development.
//!
//! Produces a deterministic random walk per ticker, seeded from a BLAKE3 hash
//! of the symbol, ending on the configured anchor date. Results built on this
//! data are tagged with `DataSource::Synthetic`.

use super::provider::{DataError, DataSource, MarketDataProvider};
use crate::domain::{Fundamentals, PriceBar, Ticker};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SyntheticProvider {
    end: NaiveDate,
}

impl SyntheticProvider {
    /// Walks end on `end` (weekends skipped).
    pub fn new(end: NaiveDate) -> Self {
        Self { end }
    }

    fn rng_for(ticker: &Ticker, salt: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(salt.as_bytes());
        hasher.update(ticker.as_str().as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// The `count` most recent weekdays up to and including `end`, ascending.
    fn trading_days(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count);
        let mut current = end;
        while days.len() < count {
            if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(current);
            }
            current -= Duration::days(1);
        }
        days.reverse();
        days
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch_history(
        &self,
        ticker: &Ticker,
        lookback_days: usize,
    ) -> Result<Vec<PriceBar>, DataError> {
        let mut rng = Self::rng_for(ticker, "bars");
        let mut price = rng.gen_range(20.0..400.0_f64);
        let drift = rng.gen_range(-0.004..0.006_f64);

        let bars = Self::trading_days(self.end, lookback_days)
            .into_iter()
            .map(|date| {
                let daily_return = drift + rng.gen_range(-0.025..0.025_f64);
                let open = price;
                let close = price * (1.0 + daily_return);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = rng.gen_range(500_000..5_000_000u64);
                price = close;
                PriceBar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }
            })
            .collect();
        Ok(bars)
    }

    fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, DataError> {
        let mut rng = Self::rng_for(ticker, "fundamentals");
        let low = rng.gen_range(20.0..300.0_f64);
        Ok(Fundamentals {
            as_of: Some(self.end),
            market_cap: Some(10f64.powf(rng.gen_range(9.5..12.5))),
            pe_ratio: Some(rng.gen_range(8.0..60.0)),
            dividend_yield: Some(rng.gen_range(0.0..0.04)),
            fifty_two_week_high: Some(low * rng.gen_range(1.1..1.8)),
            fifty_two_week_low: Some(low),
            average_volume: Some(rng.gen_range(500_000..5_000_000u64)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SyntheticProvider {
        SyntheticProvider::new(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap())
    }

    #[test]
    fn deterministic_per_ticker() {
        let t = Ticker::parse("NVDA").unwrap();
        let a = provider().fetch_history(&t, 5).unwrap();
        let b = provider().fetch_history(&t, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_tickers_differ() {
        let a = provider()
            .fetch_history(&Ticker::parse("NVDA").unwrap(), 5)
            .unwrap();
        let b = provider()
            .fetch_history(&Ticker::parse("AMZN").unwrap(), 5)
            .unwrap();
        assert_ne!(a[0].close, b[0].close);
    }

    #[test]
    fn skips_weekends_and_ends_on_anchor() {
        let bars = provider()
            .fetch_history(&Ticker::parse("SPY").unwrap(), 7)
            .unwrap();
        assert_eq!(bars.len(), 7);
        assert_eq!(bars.last().unwrap().date, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
        assert!(bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        assert!(bars.iter().all(PriceBar::is_sane));
    }
}

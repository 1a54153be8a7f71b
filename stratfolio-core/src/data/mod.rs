//! Market data: the provider trait, shipped providers, and the concurrent
//! fetch helper.

pub mod circuit_breaker;
pub mod csv_import;
pub mod fetch;
pub mod memory;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use fetch::{fetch_all, fetch_one, FetchResults, TickerData};
pub use memory::InMemoryProvider;
pub use provider::{DataError, DataSource, MarketDataProvider};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;

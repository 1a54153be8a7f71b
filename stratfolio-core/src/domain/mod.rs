//! Domain types for Stratfolio

pub mod bar;
pub mod fundamentals;
pub mod money;
pub mod ticker;

pub use bar::PriceBar;
pub use fundamentals::Fundamentals;
pub use money::Cents;
pub use ticker::{Ticker, TickerError};

//! Remote data sources.
//!
//! The loader talks to a [`MarketChartSource`] rather than to an HTTP client
//! directly, so tests and alternative front-ends can supply their own.

pub mod coingecko;

pub use coingecko::*;

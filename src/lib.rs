//! TICKERBOARD: market-data dashboard data layer.
//!
//! Library crate exposing the fetch-lifecycle stores, the sort engine and
//! the ticker index for use by integration tests and the binary entry point.

pub mod config;
pub mod display;
pub mod sort;
pub mod store;
pub mod tickers;
pub mod transport;
pub mod types;

//! Daily OHLCV analytics: volume by price, monthly seasonality, per-year
//! performance curves and the closest historical year.
//!
//! Rows come from a [`market_data_ingestor::providers::DataProvider`]; start
//! at [`report::analyze_rows`].

pub mod config;
pub mod daily_change;
pub mod errors;
pub mod monthly_bias;
pub mod record;
pub mod report;
pub mod similarity;
pub mod volume_profile;

//! Daily OHLCV row ingestion.
//!
//! Providers fetch a symbol's full daily history from a vendor or a file and
//! normalize it into canonical [`RawRow`](models::raw_row::RawRow)s for the
//! analytics layer.

pub mod models;
pub mod providers;
pub mod retry;
pub mod schema;

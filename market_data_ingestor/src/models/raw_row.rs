//! Canonical in-memory representation of a raw daily row.
//!
//! Every [`DataProvider`](crate::providers::DataProvider) hands rows to the
//! analytics layer in this shape, regardless of the upstream CSV layout. Fields
//! are kept as the provider's strings; numeric validation happens downstream so
//! that a bad field drops one row instead of the whole download.

use serde::{Deserialize, Serialize};

/// One trading day as `[date, open, high, low, close, volume]` strings.
///
/// `date` is an ISO `YYYY-MM-DD` string once the row has been normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

impl RawRow {
    /// The fields in canonical order.
    pub fn fields(&self) -> [&str; 6] {
        [
            &self.date,
            &self.open,
            &self.high,
            &self.low,
            &self.close,
            &self.volume,
        ]
    }
}

impl From<[&str; 6]> for RawRow {
    fn from([date, open, high, low, close, volume]: [&str; 6]) -> Self {
        Self {
            date: date.to_string(),
            open: open.to_string(),
            high: high.to_string(),
            low: low.to_string(),
            close: close.to_string(),
            volume: volume.to_string(),
        }
    }
}

impl From<[String; 6]> for RawRow {
    fn from([date, open, high, low, close, volume]: [String; 6]) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

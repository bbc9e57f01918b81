//! Validated daily records.
//!
//! Raw provider rows are strings; a row becomes a [`DailyRecord`] only if every
//! field parses. Rows that don't are dropped whole (never partially applied)
//! and reported next to the records, so one bad line never fails an analysis.

use chrono::{Datelike, NaiveDate};
use market_data_ingestor::models::raw_row::RawRow;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::AnalysisError;

/// One well-formed trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl DailyRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Midpoint of the day's range.
    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

fn parse_price(field: &'static str, value: &str) -> Result<f64, AnalysisError> {
    match value.trim().parse::<f64>() {
        Ok(price) if price.is_finite() => Ok(price),
        _ => Err(AnalysisError::MalformedRow {
            field,
            value: value.to_string(),
        }),
    }
}

impl TryFrom<&RawRow> for DailyRecord {
    type Error = AnalysisError;

    fn try_from(row: &RawRow) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").map_err(|_| {
            AnalysisError::MalformedRow {
                field: "date",
                value: row.date.clone(),
            }
        })?;
        let volume = row
            .volume
            .trim()
            .parse::<u64>()
            .map_err(|_| AnalysisError::MalformedRow {
                field: "volume",
                value: row.volume.clone(),
            })?;

        Ok(Self {
            date,
            open: parse_price("open", &row.open)?,
            high: parse_price("high", &row.high)?,
            low: parse_price("low", &row.low)?,
            close: parse_price("close", &row.close)?,
            volume,
        })
    }
}

/// Outcome of validating a batch of raw rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRows {
    /// Well-formed records, in input order.
    pub records: Vec<DailyRecord>,
    /// `(input index, reason)` for every dropped row.
    pub rejected: Vec<(usize, AnalysisError)>,
}

/// Validate every row, keeping the good ones. Never fails.
pub fn parse_rows(rows: &[RawRow]) -> ParsedRows {
    let mut parsed = ParsedRows {
        records: Vec::with_capacity(rows.len()),
        rejected: Vec::new(),
    };

    for (idx, row) in rows.iter().enumerate() {
        match DailyRecord::try_from(row) {
            Ok(record) => parsed.records.push(record),
            Err(err) => {
                debug!(row = idx, %err, "skipping malformed row");
                parsed.rejected.push((idx, err));
            }
        }
    }

    if !parsed.rejected.is_empty() {
        warn!(
            rejected = parsed.rejected.len(),
            kept = parsed.records.len(),
            "dropped malformed rows"
        );
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: [&str; 6]) -> RawRow {
        RawRow::from(fields)
    }

    #[test]
    fn parses_well_formed_row() {
        let rec = DailyRecord::try_from(&row(["2023-01-02", "10", "12.5", " 9 ", "11", "100"])).unwrap();
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!((rec.open, rec.high, rec.low, rec.close), (10.0, 12.5, 9.0, 11.0));
        assert_eq!(rec.volume, 100);
        assert_eq!(rec.mid(), 10.75);
    }

    #[test]
    fn each_field_is_validated() {
        let cases = [
            (["2023-13-02", "10", "12", "9", "11", "100"], "date"),
            (["2023-01-02", "x", "12", "9", "11", "100"], "open"),
            (["2023-01-02", "10", "", "9", "11", "100"], "high"),
            (["2023-01-02", "10", "12", "NaN", "11", "100"], "low"),
            (["2023-01-02", "10", "12", "9", "inf", "100"], "close"),
            (["2023-01-02", "10", "12", "9", "11", "abc"], "volume"),
            (["2023-01-02", "10", "12", "9", "11", "-5"], "volume"),
            (["2023-01-02", "10", "12", "9", "11", "100.5"], "volume"),
        ];
        for (fields, want) in cases {
            match DailyRecord::try_from(&row(fields)) {
                Err(AnalysisError::MalformedRow { field, .. }) => assert_eq!(field, want, "{fields:?}"),
                other => panic!("expected malformed {want}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_rows_keeps_good_rows_and_reports_bad_ones() {
        let rows = vec![
            row(["2023-01-02", "10", "12", "9", "11", "100"]),
            row(["2023-01-03", "11", "13", "10", "12", "n/a"]),
            row(["2023-01-04", "12", "14", "11", "13", "300"]),
        ];
        let parsed = parse_rows(&rows);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].0, 1);
        assert!(parse_rows(&[]).records.is_empty());
    }
}

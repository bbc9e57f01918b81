//! Daily OHLCV CSV normalization.
//!
//! Upstreams disagree on layout:
//! - Alpha Vantage: `timestamp,open,high,low,close,volume`, newest first.
//! - Exchange dumps (CryptoDataDownload style): a banner line, then
//!   `Unix,Date,Symbol,Open,High,Low,Close,Volume BTC,Volume USDT,tradecount`,
//!   with `Date` carrying a time of day.
//! - Hand-made files: canonical `date,open,high,low,close,volume`, with or
//!   without a header.
//!
//! [`normalize_csv`] finds the header by column names (case-insensitive),
//! skips any preamble before it, and re-emits every data line as a canonical
//! [`RawRow`]. Values are not validated here beyond trimming the date to its
//! `YYYY-MM-DD` prefix and truncating the fractional volumes exchange dumps
//! report in `Volume <SYMBOL>` columns. A plain `volume` column passes through
//! as is, so a fractional value there is dropped later by the analytics layer
//! like any other malformed row.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::raw_row::RawRow,
    providers::{CsvSnafu, ProviderError, SchemaSnafu},
};

const DATE_COLUMNS: [&str; 4] = ["date", "timestamp", "time", "day"];

/// Column positions of the canonical fields inside one CSV layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    /// Volume comes from an exchange `Volume <SYMBOL>` column and may be
    /// fractional.
    exchange_volume: bool,
}

impl ColumnLayout {
    const CANONICAL: ColumnLayout = ColumnLayout {
        date: 0,
        open: 1,
        high: 2,
        low: 3,
        close: 4,
        volume: 5,
        exchange_volume: false,
    };

    /// Interprets `record` as a header line.
    ///
    /// Returns `Ok(None)` when the line isn't a header at all (banner text),
    /// and an error when it is a header but lacks a required column.
    fn from_header(
        record: &StringRecord,
        base_symbol: Option<&str>,
    ) -> Result<Option<Self>, ProviderError> {
        let mut columns: IndexMap<String, usize> = IndexMap::new();
        for (idx, name) in record.iter().enumerate() {
            columns.entry(name.trim().to_lowercase()).or_insert(idx);
        }

        if !(columns.contains_key("open") && columns.contains_key("close")) {
            return Ok(None);
        }

        let required = |name: &str| -> Result<usize, ProviderError> {
            columns.get(name).copied().ok_or_else(|| {
                SchemaSnafu {
                    message: format!("missing `{name}` column"),
                }
                .build()
            })
        };

        let date = DATE_COLUMNS
            .iter()
            .find_map(|name| columns.get(*name).copied())
            .ok_or_else(|| {
                SchemaSnafu {
                    message: "missing date column (date/timestamp/time/day)",
                }
                .build()
            })?;

        let base_volume = base_symbol
            .and_then(|base| columns.get(&format!("volume {}", base.trim().to_lowercase())));
        let (volume, exchange_volume) = match (base_volume, columns.get("volume")) {
            (Some(idx), _) => (Some(*idx), true),
            (None, Some(idx)) => (Some(*idx), false),
            (None, None) => (
                columns
                    .iter()
                    .find(|(name, _)| name.starts_with("volume"))
                    .map(|(_, idx)| *idx),
                true,
            ),
        };
        let volume = volume.ok_or_else(|| {
            SchemaSnafu {
                message: "missing volume column",
            }
            .build()
        })?;

        Ok(Some(Self {
            date,
            open: required("open")?,
            high: required("high")?,
            low: required("low")?,
            close: required("close")?,
            volume,
            exchange_volume,
        }))
    }

    /// A header-less canonical file starts straight away with a dated row.
    fn looks_like_canonical_data(record: &StringRecord) -> bool {
        record.len() >= 6
            && record
                .get(0)
                .map(|field| NaiveDate::parse_from_str(date_prefix(field), "%Y-%m-%d").is_ok())
                .unwrap_or(false)
    }

    fn extract(&self, record: &StringRecord) -> RawRow {
        let field = |idx: usize| record.get(idx).unwrap_or("");
        RawRow {
            date: date_prefix(field(self.date)).to_string(),
            open: field(self.open).to_string(),
            high: field(self.high).to_string(),
            low: field(self.low).to_string(),
            close: field(self.close).to_string(),
            volume: if self.exchange_volume {
                integral_volume(field(self.volume))
            } else {
                field(self.volume).trim().to_string()
            },
        }
    }
}

/// `"2024-01-02 00:00:00"` -> `"2024-01-02"`. Shorter values pass through.
fn date_prefix(value: &str) -> &str {
    let value = value.trim();
    match value.get(..10) {
        Some(prefix) if value.len() > 10 => prefix,
        _ => value,
    }
}

/// Exchange dumps report fractional base-asset volume; the canonical row
/// carries an integer, truncated toward zero.
fn integral_volume(value: &str) -> String {
    let value = value.trim();
    if value.parse::<u64>().is_ok() {
        return value.to_string();
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => format!("{}", v.trunc() as u64),
        _ => value.to_string(),
    }
}

/// Normalize a daily OHLCV CSV payload into canonical rows.
///
/// `base_symbol` selects the `Volume <SYMBOL>` column when a layout reports
/// volume in several currencies (e.g. `Volume BTC` next to `Volume USDT`).
///
/// Errors:
/// - the payload is not readable CSV
/// - no header (and no header-less canonical data) was found
/// - the header lacks a date, open, high, low, close or volume column
pub fn normalize_csv(text: &str, base_symbol: Option<&str>) -> Result<Vec<RawRow>, ProviderError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut layout: Option<ColumnLayout> = None;
    let mut rows = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record.context(CsvSnafu)?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        match layout {
            Some(layout) => rows.push(layout.extract(&record)),
            None => {
                if let Some(found) = ColumnLayout::from_header(&record, base_symbol)? {
                    debug!(line, ?found, "detected CSV header");
                    layout = Some(found);
                } else if ColumnLayout::looks_like_canonical_data(&record) {
                    debug!(line, "header-less canonical CSV");
                    layout = Some(ColumnLayout::CANONICAL);
                    rows.push(ColumnLayout::CANONICAL.extract(&record));
                } else {
                    debug!(line, "skipping preamble line");
                }
            }
        }
    }

    if layout.is_none() {
        return SchemaSnafu {
            message: "no header row with open/high/low/close columns",
        }
        .fail();
    }
    Ok(rows)
}

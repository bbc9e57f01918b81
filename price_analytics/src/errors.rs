use serde::Serialize;
use thiserror::Error;

/// Errors produced by the analytics engine.
///
/// Only [`AnalysisError::InvalidArgument`] and [`AnalysisError::NotEnoughData`]
/// abort a call. The others describe one skipped row, year or candidate and are
/// collected next to the partial result they were excluded from.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisError {
    /// A raw row failed date or numeric parsing and was dropped.
    #[error("malformed row: {field} = {value:?}")]
    MalformedRow { field: &'static str, value: String },

    /// A year's first close is zero, so it can't be rebased to percentages.
    #[error("invalid price data for {year}: first close is zero")]
    InvalidPriceData { year: i32 },

    /// Too few overlapping days with the target year to correlate.
    #[error("insufficient data for {year}: {overlap} overlapping day(s), need at least 2")]
    InsufficientData { year: i32, overlap: usize },

    /// The overlapping days of one side never move, so correlation is undefined.
    #[error("degenerate series for {year}: no price variation over the compared days")]
    DegenerateSeries { year: i32 },

    /// Caller configuration error (unknown metric, negative weight, ...).
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Fewer usable rows than the analysis needs.
    #[error("not enough data: {usable} usable row(s), need at least {required}")]
    NotEnoughData { usable: usize, required: usize },
}

impl AnalysisError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        AnalysisError::InvalidArgument {
            message: message.into(),
        }
    }
}

//! Per-year performance curves.
//!
//! Each calendar year is rebased to its first close: day `i` becomes
//! `(close_i - close_first) / close_first * 100`. Years don't depend on each
//! other and are rebased in parallel.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{errors::AnalysisError, record::DailyRecord};

/// Percentage-change curves keyed by year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearlyChanges {
    /// One value per trading day, date ascending. Every curve starts at `0.0`.
    pub changes: BTreeMap<i32, Vec<f64>>,
    /// The leading year dropped as incomplete, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_year: Option<i32>,
    /// Years that could not be rebased.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rejected: BTreeMap<i32, AnalysisError>,
}

fn rebase(year: i32, mut days: Vec<&DailyRecord>) -> Result<Vec<f64>, AnalysisError> {
    days.sort_by_key(|record| record.date);
    let first_close = match days.first() {
        Some(first) if first.close != 0.0 => first.close,
        _ => return Err(AnalysisError::InvalidPriceData { year }),
    };
    Ok(days
        .iter()
        .map(|record| (record.close - first_close) / first_close * 100.0)
        .collect())
}

/// Rebase every year's closes to percentages of its first close.
///
/// With `exclude_incomplete_start_year`, the year of the earliest record is
/// left out: a history that starts mid-year would otherwise yield a short,
/// misleading curve. The most recent year is always kept so it can be
/// compared against the others.
///
/// A year whose first close is zero lands in [`YearlyChanges::rejected`]; the
/// remaining years are unaffected.
pub fn daily_percentage_changes(
    records: &[DailyRecord],
    exclude_incomplete_start_year: bool,
) -> YearlyChanges {
    let mut by_year: BTreeMap<i32, Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        by_year.entry(record.year()).or_default().push(record);
    }

    let excluded_year = if exclude_incomplete_start_year {
        by_year.keys().next().copied()
    } else {
        None
    };
    if let Some(year) = excluded_year {
        by_year.remove(&year);
        debug!(year, "excluding leading year from daily changes");
    }

    let rebased: Vec<(i32, Result<Vec<f64>, AnalysisError>)> = by_year
        .into_par_iter()
        .map(|(year, days)| (year, rebase(year, days)))
        .collect();

    let mut result = YearlyChanges {
        excluded_year,
        ..Default::default()
    };
    for (year, outcome) in rebased {
        match outcome {
            Ok(curve) => {
                result.changes.insert(year, curve);
            }
            Err(err) => {
                warn!(year, %err, "skipping year");
                result.rejected.insert(year, err);
            }
        }
    }
    result
}

//! The analysis bundle handed to presentation.
//!
//! [`analyze_rows`] is the entry point callers use: it validates raw provider
//! rows, refuses inputs that are too small to say anything, and runs the four
//! aggregations. The resulting [`AnalysisReport`] is rendered as text through
//! `Display` or as JSON through serde; neither path recomputes anything.

use std::{
    fmt,
    time::{Duration, Instant},
};

use chrono::{Datelike, Utc};
use market_data_ingestor::models::raw_row::RawRow;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::{
    daily_change::{YearlyChanges, daily_percentage_changes},
    errors::AnalysisError,
    monthly_bias::{MonthlyBias, aggregate_monthly_bias},
    record::{DailyRecord, ParsedRows, parse_rows},
    similarity::{SimilarityMetric, SimilarityResult, find_closest_year},
    volume_profile::{VolumeProfile, VolumeWeights, aggregate_volume_by_price},
};

/// Fewer usable rows than this and the analysis is not run.
pub const MIN_USABLE_ROWS: usize = 3;

/// Knobs for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub weights: VolumeWeights,
    pub metric: SimilarityMetric,
    /// Year to find a match for. Defaults to the most recent year in the data.
    pub target_year: Option<i32>,
    pub exclude_incomplete_start_year: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            weights: VolumeWeights::default(),
            metric: SimilarityMetric::default(),
            target_year: None,
            exclude_incomplete_start_year: true,
        }
    }
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub rows_used: usize,
    pub rows_rejected: usize,
    pub volume_profile: VolumeProfile,
    pub monthly_bias: MonthlyBias,
    pub yearly_changes: YearlyChanges,
    pub similarity: SimilarityResult,
    #[serde(rename = "elapsed_secs", serialize_with = "secs_f64")]
    pub elapsed: Duration,
}

fn secs_f64<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Run all four aggregations over already validated rows.
///
/// The three aggregations over the records are independent and run
/// concurrently; the similarity search then runs over the daily changes.
/// No minimum row count is enforced here; see [`analyze_rows`].
pub fn analyze_records(
    symbol: &str,
    parsed: &ParsedRows,
    options: &AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    options.weights.validate()?;
    let records = parsed.records.as_slice();
    let started = Instant::now();

    let ((volume_profile, monthly_bias), yearly_changes) = rayon::join(
        || {
            rayon::join(
                || aggregate_volume_by_price(records, &options.weights),
                || aggregate_monthly_bias(records),
            )
        },
        || daily_percentage_changes(records, options.exclude_incomplete_start_year),
    );

    let target_year = options
        .target_year
        .or_else(|| records.iter().map(DailyRecord::year).max())
        .unwrap_or_else(|| Utc::now().year());
    let similarity = find_closest_year(&yearly_changes.changes, target_year, options.metric);

    Ok(AnalysisReport {
        symbol: symbol.to_string(),
        rows_used: records.len(),
        rows_rejected: parsed.rejected.len(),
        volume_profile,
        monthly_bias,
        yearly_changes,
        similarity,
        elapsed: started.elapsed(),
    })
}

/// Validate raw rows and analyze the usable ones.
///
/// Errors:
/// - [`AnalysisError::NotEnoughData`] when fewer than [`MIN_USABLE_ROWS`]
///   rows survive validation
/// - [`AnalysisError::InvalidArgument`] for bad weights
pub fn analyze_rows(
    symbol: &str,
    rows: &[RawRow],
    options: &AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    let started = Instant::now();
    let parsed = parse_rows(rows);

    if parsed.records.len() < MIN_USABLE_ROWS {
        warn!(
            symbol,
            usable = parsed.records.len(),
            total = rows.len(),
            "not enough data to analyze"
        );
        return Err(AnalysisError::NotEnoughData {
            usable: parsed.records.len(),
            required: MIN_USABLE_ROWS,
        });
    }

    let mut report = analyze_records(symbol, &parsed, options)?;
    report.elapsed = started.elapsed();
    info!(
        symbol,
        rows = report.rows_used,
        rejected = report.rows_rejected,
        levels = report.volume_profile.len(),
        years = report.yearly_changes.changes.len(),
        "analysis complete"
    );
    Ok(report)
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(title.len()))
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} rows analyzed, {} rejected",
            self.symbol, self.rows_used, self.rows_rejected
        )?;

        section(f, "Volume by price")?;
        for (price, volume) in self.volume_profile.iter() {
            writeln!(f, "{price:>10}  {volume:>10}")?;
        }
        if let Some((price, volume)) = self.volume_profile.point_of_control() {
            writeln!(f, "Point of control: {price} ({volume})")?;
        }

        section(f, "Monthly bias (last close - first open)")?;
        for (month, change) in self.monthly_bias.calendar() {
            writeln!(f, "{}  {change:>+10.4}", month.abbrev())?;
        }

        section(f, "Daily change by year")?;
        if let Some(year) = self.yearly_changes.excluded_year {
            writeln!(f, "{year}  excluded (incomplete)")?;
        }
        for (year, curve) in &self.yearly_changes.changes {
            let last = curve.last().copied().unwrap_or(0.0);
            writeln!(f, "{year}  {:>3} days  {last:>+8.2}%", curve.len())?;
        }
        for (year, err) in &self.yearly_changes.rejected {
            writeln!(f, "{year}  skipped: {err}")?;
        }

        section(f, "Seasonality")?;
        let sim = &self.similarity;
        match (sim.matched_year, sim.score) {
            (Some(matched), Some(score)) => writeln!(
                f,
                "{} vs {matched} ({}, score {score:.4})",
                sim.target_year, sim.metric
            )?,
            _ => writeln!(f, "{}: no comparable year ({})", sim.target_year, sim.metric)?,
        }
        for err in &sim.skipped {
            writeln!(f, "skipped: {err}")?;
        }
        Ok(())
    }
}

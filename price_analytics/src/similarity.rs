//! Finding the historical year that moved most like the target year.
//!
//! The target curve is compared against every other year over the shorter of
//! the two lengths, so a partially elapsed year is matched against the same
//! number of trading days in each candidate.

use std::{collections::BTreeMap, fmt, str::FromStr};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::AnalysisError;

/// How two curves are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SimilarityMetric {
    /// Distance between the curves; smaller is closer.
    #[default]
    Euclidean,
    /// Sample correlation of the curves; larger is closer.
    Pearson,
}

impl SimilarityMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            SimilarityMetric::Euclidean => "euclidean",
            SimilarityMetric::Pearson => "pearson",
        }
    }

    /// Worst possible score, the starting point of the search.
    fn worst(self) -> f64 {
        match self {
            SimilarityMetric::Euclidean => f64::INFINITY,
            SimilarityMetric::Pearson => f64::NEG_INFINITY,
        }
    }

    /// Strictly better, so an equal later score never displaces an earlier one.
    fn improves(self, candidate: f64, best: f64) -> bool {
        match self {
            SimilarityMetric::Euclidean => candidate < best,
            SimilarityMetric::Pearson => candidate > best,
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(SimilarityMetric::Euclidean),
            "pearson" => Ok(SimilarityMetric::Pearson),
            other => Err(AnalysisError::invalid_argument(format!(
                "unknown similarity metric `{other}` (expected `euclidean` or `pearson`)"
            ))),
        }
    }
}

impl TryFrom<String> for SimilarityMetric {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Outcome of a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub metric: SimilarityMetric,
    pub target_year: i32,
    /// Empty when the target year has no data.
    pub target_sequence: Vec<f64>,
    /// `None` when no other year could be compared.
    pub matched_year: Option<i32>,
    /// The matched year's whole curve, including the days past the compared
    /// prefix.
    pub matched_sequence: Option<Vec<f64>>,
    pub score: Option<f64>,
    /// Candidates excluded from the search.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<AnalysisError>,
}

impl SimilarityResult {
    fn unmatched(metric: SimilarityMetric, target_year: i32, target_sequence: Vec<f64>) -> Self {
        Self {
            metric,
            target_year,
            target_sequence,
            matched_year: None,
            matched_sequence: None,
            score: None,
            skipped: Vec::new(),
        }
    }
}

/// `sqrt(sum((a_i - b_i)^2))` over the common prefix of `a` and `b`.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Sample Pearson correlation over the common prefix of `a` and `b`.
///
/// `None` when the prefix has fewer than two points or either side is
/// constant over it.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

fn score(
    metric: SimilarityMetric,
    year: i32,
    target: &[f64],
    candidate: &[f64],
) -> Result<f64, AnalysisError> {
    match metric {
        SimilarityMetric::Euclidean => Ok(euclidean_distance(target, candidate)),
        SimilarityMetric::Pearson => {
            let overlap = target.len().min(candidate.len());
            if overlap < 2 {
                return Err(AnalysisError::InsufficientData { year, overlap });
            }
            pearson_correlation(target, candidate).ok_or(AnalysisError::DegenerateSeries { year })
        }
    }
}

/// Find the year whose curve is closest to `target_year`'s.
///
/// Candidates are scored in parallel; the winner is picked in ascending year
/// order with a strict comparison, so the earliest year wins ties. A Pearson
/// candidate that cannot be scored is skipped and listed in
/// [`SimilarityResult::skipped`].
pub fn find_closest_year(
    changes_by_year: &BTreeMap<i32, Vec<f64>>,
    target_year: i32,
    metric: SimilarityMetric,
) -> SimilarityResult {
    let Some(target) = changes_by_year.get(&target_year) else {
        info!(target_year, "target year has no data; nothing to compare");
        return SimilarityResult::unmatched(metric, target_year, Vec::new());
    };

    let mut scored: Vec<(i32, Result<f64, AnalysisError>)> = changes_by_year
        .par_iter()
        .filter(|(year, _)| **year != target_year)
        .map(|(year, curve)| (*year, score(metric, *year, target, curve)))
        .collect();
    scored.sort_by_key(|(year, _)| *year);

    let mut result = SimilarityResult::unmatched(metric, target_year, target.clone());
    let mut best = metric.worst();
    for (year, outcome) in scored {
        match outcome {
            Ok(value) if metric.improves(value, best) => {
                best = value;
                result.matched_year = Some(year);
                result.score = Some(value);
            }
            Ok(_) => {}
            Err(err) => {
                debug!(year, %err, "skipping candidate year");
                result.skipped.push(err);
            }
        }
    }
    result.matched_sequence = result
        .matched_year
        .and_then(|year| changes_by_year.get(&year).cloned());

    match (result.matched_year, result.score) {
        (Some(year), Some(score)) => info!(target_year, matched_year = year, score, %metric, "closest year found"),
        _ => info!(target_year, %metric, "no comparable year"),
    }
    result
}

/// [`find_closest_year`] with the metric given by name.
///
/// An unknown metric fails before any candidate is looked at.
pub fn find_closest_year_by_name(
    changes_by_year: &BTreeMap<i32, Vec<f64>>,
    target_year: i32,
    metric: &str,
) -> Result<SimilarityResult, AnalysisError> {
    let metric = metric.parse()?;
    Ok(find_closest_year(changes_by_year, target_year, metric))
}

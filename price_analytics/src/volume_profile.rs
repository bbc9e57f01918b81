//! Volume by price.
//!
//! Each day's volume is split across the prices it traded at (open, high, low,
//! close and optionally the mid of the range) using fixed weights, and summed
//! per exact price level. There is no price grid: a level exists because some
//! record printed that price.

use std::{cmp::Ordering, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::{errors::AnalysisError, record::DailyRecord};

/// A price used as a map key. Ordered with `f64::total_cmp`; `-0.0` is folded
/// into `0.0` so both spell the same level.
#[derive(Debug, Clone, Copy)]
pub struct PriceLevel(f64);

impl PriceLevel {
    pub fn new(price: f64) -> Self {
        if price == 0.0 { Self(0.0) } else { Self(price) }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for PriceLevel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriceLevel {}

impl PartialOrd for PriceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Share of each day's volume attributed to each of its prices.
///
/// The weights should be non-negative and sum to 1.0. The aggregator does not
/// enforce this: a different sum scales the total volume represented in the
/// profile, which is the caller's call to make.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeWeights {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Weight for `(high + low) / 2`. No mid level is produced when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mid: Option<f64>,
}

impl Default for VolumeWeights {
    fn default() -> Self {
        Self {
            open: 0.3,
            high: 0.2,
            low: 0.2,
            close: 0.3,
            mid: None,
        }
    }
}

impl VolumeWeights {
    pub fn sum(&self) -> f64 {
        self.open + self.high + self.low + self.close + self.mid.unwrap_or(0.0)
    }

    /// Rejects negative or non-finite weights. A sum other than 1.0 is allowed
    /// but logged.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let named = [
            ("open", Some(self.open)),
            ("high", Some(self.high)),
            ("low", Some(self.low)),
            ("close", Some(self.close)),
            ("mid", self.mid),
        ];
        for (name, weight) in named {
            if let Some(w) = weight {
                if !w.is_finite() || w < 0.0 {
                    return Err(AnalysisError::invalid_argument(format!(
                        "{name} weight must be a non-negative number, got {w}"
                    )));
                }
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-9 {
            warn!(sum, "volume weights do not sum to 1.0; profile totals will be scaled");
        }
        Ok(())
    }
}

/// Accumulated weighted volume per price level, ascending by price.
///
/// Levels saturate at `u64::MAX` instead of wrapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumeProfile {
    levels: BTreeMap<PriceLevel, u64>,
}

impl VolumeProfile {
    pub fn get(&self, price: f64) -> Option<u64> {
        self.levels.get(&PriceLevel::new(price)).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// `(price, weighted volume)` pairs, lowest price first.
    pub fn iter(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.levels.iter().map(|(price, volume)| (price.value(), *volume))
    }

    /// Sum over all levels, saturating at `u64::MAX`.
    pub fn total_weighted_volume(&self) -> u64 {
        self.levels
            .values()
            .fold(0u64, |total, volume| total.saturating_add(*volume))
    }

    /// The level with the most volume (lowest price on ties).
    pub fn point_of_control(&self) -> Option<(f64, u64)> {
        self.iter()
            .fold(None, |best: Option<(f64, u64)>, (price, volume)| match best {
                Some((_, top)) if top >= volume => best,
                _ => Some((price, volume)),
            })
    }
}

#[derive(Serialize)]
struct LevelEntry {
    price: f64,
    volume: u64,
}

// JSON object keys must be strings, so levels go out as a list.
impl Serialize for VolumeProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|(price, volume)| LevelEntry { price, volume }))
    }
}

/// `floor(volume * weight)`, truncating like an integer cast. Rounding would
/// change reproducible totals.
fn weighted_volume(volume: u64, weight: f64) -> u64 {
    (volume as f64 * weight).trunc() as u64
}

/// Distribute each record's volume over its price levels.
///
/// Records must already be well formed (see [`crate::record::parse_rows`]);
/// an empty input gives an empty profile. Order of `records` is irrelevant.
pub fn aggregate_volume_by_price(records: &[DailyRecord], weights: &VolumeWeights) -> VolumeProfile {
    let mut levels: BTreeMap<PriceLevel, u64> = BTreeMap::new();

    for record in records {
        let mut add = |price: f64, weight: f64| {
            let level = levels.entry(PriceLevel::new(price)).or_insert(0);
            *level = level.saturating_add(weighted_volume(record.volume, weight));
        };
        add(record.open, weights.open);
        add(record.high, weights.high);
        add(record.low, weights.low);
        add(record.close, weights.close);
        if let Some(mid_weight) = weights.mid {
            add(record.mid(), mid_weight);
        }
    }

    VolumeProfile { levels }
}

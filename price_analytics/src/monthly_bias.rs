//! Seasonality by calendar month.
//!
//! Every month-instance (a year and month that appear in the data) contributes
//! `last close - first open`. Instances sharing a calendar month are averaged
//! without weighting, so the result reads as "what does March usually do".

use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};

use crate::record::DailyRecord;

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar month, `1..=12`. Shown and serialized as `"01".."12"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey(u32);

impl MonthKey {
    pub fn new(month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(month))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn abbrev(self) -> &'static str {
        MONTH_ABBREVS[(self.0 - 1) as usize]
    }

    /// January through December.
    pub fn all() -> impl Iterator<Item = MonthKey> {
        (1..=12).map(MonthKey)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Average month-instance change per calendar month. Only months present in
/// the input are keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MonthlyBias {
    months: BTreeMap<MonthKey, f64>,
}

impl MonthlyBias {
    pub fn get(&self, month: u32) -> Option<f64> {
        MonthKey::new(month).and_then(|key| self.months.get(&key).copied())
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonthKey, f64)> + '_ {
        self.months.iter().map(|(month, change)| (*month, *change))
    }

    /// All twelve months, with months absent from the data shown as `0.0`.
    /// Meant for display; the zeros are not observations.
    pub fn calendar(&self) -> Vec<(MonthKey, f64)> {
        MonthKey::all()
            .map(|month| (month, self.months.get(&month).copied().unwrap_or(0.0)))
            .collect()
    }
}

/// Average `last close - first open` per calendar month across all years.
pub fn aggregate_monthly_bias(records: &[DailyRecord]) -> MonthlyBias {
    let mut instances: BTreeMap<(i32, u32), Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        instances
            .entry((record.year(), record.month()))
            .or_default()
            .push(record);
    }

    // (sum of changes, number of month-instances)
    let mut totals: BTreeMap<MonthKey, (f64, usize)> = BTreeMap::new();
    for ((_, month), mut days) in instances {
        days.sort_by_key(|record| record.date);
        let (Some(first), Some(last)) = (days.first(), days.last()) else {
            continue;
        };
        let Some(key) = MonthKey::new(month) else {
            continue;
        };
        let entry = totals.entry(key).or_insert((0.0, 0));
        entry.0 += last.close - first.open;
        entry.1 += 1;
    }

    MonthlyBias {
        months: totals
            .into_iter()
            .map(|(month, (sum, count))| (month, sum / count as f64))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(date: &str, open: f64, close: f64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1,
        }
    }

    #[test]
    fn change_uses_first_open_and_last_close_by_date() {
        // Deliberately out of order.
        let records = [
            rec("2023-03-31", 14.0, 15.0),
            rec("2023-03-01", 10.0, 11.0),
            rec("2023-03-15", 12.0, 13.0),
        ];
        let bias = aggregate_monthly_bias(&records);
        assert_eq!(bias.len(), 1);
        assert_eq!(bias.get(3), Some(5.0));
    }

    #[test]
    fn averages_across_years_without_weighting() {
        let records = [
            rec("2021-01-04", 10.0, 11.0),
            rec("2021-01-05", 11.0, 12.0),
            rec("2021-01-06", 12.0, 14.0),
            rec("2022-01-03", 20.0, 18.0),
        ];
        // 2021-01: 14 - 10 = 4, 2022-01: 18 - 20 = -2
        assert_eq!(aggregate_monthly_bias(&records).get(1), Some(1.0));
    }

    #[test]
    fn only_present_months_are_keys() {
        let records = [rec("2023-02-01", 1.0, 2.0), rec("2023-11-01", 3.0, 1.0)];
        let bias = aggregate_monthly_bias(&records);
        let keys: Vec<String> = bias.iter().map(|(m, _)| m.to_string()).collect();
        assert_eq!(keys, ["02", "11"]);
        assert_eq!(bias.get(5), None);

        let calendar = bias.calendar();
        assert_eq!(calendar.len(), 12);
        assert_eq!(calendar[1], (MonthKey::new(2).unwrap(), 1.0));
        assert_eq!(calendar[4].1, 0.0);
        assert_eq!(calendar[10].1, -2.0);
    }

    #[test]
    fn empty_input() {
        assert!(aggregate_monthly_bias(&[]).is_empty());
    }

    #[test]
    fn month_keys() {
        assert!(MonthKey::new(0).is_none());
        assert!(MonthKey::new(13).is_none());
        assert_eq!(MonthKey::new(9).unwrap().abbrev(), "Sep");
        assert_eq!(MonthKey::all().count(), 12);
    }

    #[test]
    fn serializes_with_two_digit_keys() {
        let bias = aggregate_monthly_bias(&[rec("2023-07-03", 1.0, 1.5)]);
        let json = serde_json::to_string(&bias).unwrap();
        assert_eq!(json, r#"{"07":0.5}"#);
    }

    #[test]
    fn idempotent() {
        let records = [rec("2023-03-01", 10.0, 11.0), rec("2024-03-01", 11.0, 9.0)];
        assert_eq!(aggregate_monthly_bias(&records), aggregate_monthly_bias(&records));
    }
}

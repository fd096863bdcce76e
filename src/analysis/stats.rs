/// Descriptive statistics for console summaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Observation;

/// Statistics for a data series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl SeriesStats {
    /// Compute statistics from values, filtering out NaN and infinities.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }

        let count = vals.len();
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = vals.iter().sum::<f64>() / count as f64;

        vals.sort_by(f64::total_cmp);
        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        let variance = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(SeriesStats {
            count,
            min,
            max,
            mean,
            median,
            std_dev: variance.sqrt(),
        })
    }

    /// Format as a multi-line report string.
    pub fn report(&self, label: &str) -> String {
        format!(
            concat!(
                "{}:\n  Count: {}\n  Min: {:.2} m\n  Max: {:.2} m\n",
                "  Mean: {:.2} m\n  Median: {:.2} m\n  Std Dev: {:.2} m\n",
            ),
            label, self.count, self.min, self.max, self.mean, self.median, self.std_dev
        )
    }
}

/// Statistics of the observations falling in each calendar year.
pub fn stats_by_year(observations: &[Observation]) -> BTreeMap<i32, SeriesStats> {
    use chrono::Datelike;

    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        by_year.entry(obs.time.year()).or_default().push(obs.value);
    }
    by_year
        .into_iter()
        .filter_map(|(year, values)| SeriesStats::compute(&values).map(|s| (year, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_compute_basic_statistics() {
        let s = SeriesStats::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.count, 8);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.median, 4.5);
        assert_eq!(s.std_dev, 2.0);
    }

    #[test]
    fn test_compute_ignores_non_finite() {
        let s = SeriesStats::compute(&[1.0, f64::NAN, 3.0, f64::INFINITY]).unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.median, 2.0);
        assert!(SeriesStats::compute(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_stats_by_year_groups_on_calendar_year() {
        let at = |y, m, d, value| Observation {
            time: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
            value,
        };
        let obs = vec![at(1999, 12, 31, 1.0), at(2000, 1, 1, 3.0), at(2000, 1, 2, 5.0)];
        let by_year = stats_by_year(&obs);
        assert_eq!(by_year[&1999].count, 1);
        assert_eq!(by_year[&2000].mean, 4.0);
    }
}

/// Grouping reductions, moving-average smoothing and linear trends.
///
/// Everything here consumes tagged features or plain values and builds its
/// result from scratch; nothing is cached between analyses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::calendar::{CalendarTag, Season};
use crate::model::AnalysisError;

/// Moving-average window used when none is configured.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Number of features or events in one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualCount {
    pub year: i32,
    pub count: usize,
}

/// Mean of some per-event quantity in one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnualMean {
    pub year: i32,
    pub mean: f64,
}

/// Counts tags per year. Years without any tag are absent, not zero.
pub fn count_by_year<'a, I>(tags: I) -> Vec<AnnualCount>
where
    I: IntoIterator<Item = &'a CalendarTag>,
{
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for tag in tags {
        *counts.entry(tag.year).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(year, count)| AnnualCount { year, count })
        .collect()
}

/// Per-year mean of `(year, value)` pairs, ignoring non-finite values.
pub fn mean_by_year<I>(pairs: I) -> Vec<AnnualMean>
where
    I: IntoIterator<Item = (i32, f64)>,
{
    let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (year, value) in pairs {
        if value.is_finite() {
            let entry = sums.entry(year).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(year, (sum, n))| AnnualMean {
            year,
            mean: sum / n as f64,
        })
        .collect()
}

/// Counts per (year, season), laid out as a year × season table.
///
/// Rows are the years that have at least one tag; columns are the seasons
/// that have at least one tag. A bucket with no tags is `None`, not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonalTable {
    pub years: Vec<i32>,
    pub columns: BTreeMap<Season, Vec<Option<f64>>>,
}

impl SeasonalTable {
    pub fn from_tags<'a, I>(tags: I) -> Self
    where
        I: IntoIterator<Item = &'a CalendarTag>,
    {
        let mut buckets: BTreeMap<(i32, Season), usize> = BTreeMap::new();
        for tag in tags {
            *buckets.entry((tag.year, tag.season)).or_insert(0) += 1;
        }

        let mut years: Vec<i32> = buckets.keys().map(|&(y, _)| y).collect();
        years.dedup();

        let mut columns = BTreeMap::new();
        for &(_, season) in buckets.keys() {
            columns.entry(season).or_insert_with(|| {
                years
                    .iter()
                    .map(|&y| buckets.get(&(y, season)).map(|&c| c as f64))
                    .collect::<Vec<_>>()
            });
        }

        Self { years, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// The bucket for one (year, season), if the year is a row and the
    /// bucket is filled.
    pub fn get(&self, year: i32, season: Season) -> Option<f64> {
        let row = self.years.iter().position(|&y| y == year)?;
        self.columns.get(&season).and_then(|col| col[row])
    }

    /// Applies `rolling` down every season column independently.
    pub fn smoothed(&self, rolling: &RollingMean) -> SeasonalTable {
        SeasonalTable {
            years: self.years.clone(),
            columns: self
                .columns
                .iter()
                .map(|(&season, col)| (season, rolling.apply(col)))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Moving average
// ---------------------------------------------------------------------------

/// Fixed-window moving average, trailing or centered.
///
/// A window position yields a value when it holds at least `min_periods`
/// present cells; missing cells are skipped rather than counted as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingMean {
    window: usize,
    min_periods: usize,
    center: bool,
}

impl RollingMean {
    /// A trailing window of `window` cells with `min_periods` of 1.
    pub fn new(window: usize) -> Result<Self, AnalysisError> {
        if window == 0 {
            return Err(AnalysisError::InvalidParameter(
                "window size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            window,
            min_periods: 1,
            center: false,
        })
    }

    /// Set minimum number of present cells required to emit a value
    pub fn min_periods(mut self, min_periods: usize) -> Self {
        self.min_periods = min_periods.max(1);
        self
    }

    /// Set whether to center the window around the current cell
    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Half-open index range covered by the window at position `i`.
    fn bounds(&self, i: usize, len: usize) -> (usize, usize) {
        if self.center {
            let half = self.window / 2;
            let start = i.saturating_sub(half);
            let end = i.saturating_add(self.window - half).min(len);
            (start, end)
        } else {
            let start = (i + 1).saturating_sub(self.window);
            (start, i + 1)
        }
    }

    pub fn apply(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        (0..values.len())
            .map(|i| {
                let (start, end) = self.bounds(i, values.len());
                let (sum, n) = values[start..end]
                    .iter()
                    .flatten()
                    .filter(|v| v.is_finite())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                (n >= self.min_periods).then(|| sum / n as f64)
            })
            .collect()
    }

    /// Convenience for a fully populated sequence.
    pub fn apply_values(&self, values: &[f64]) -> Vec<Option<f64>> {
        let cells: Vec<Option<f64>> = values.iter().map(|&v| Some(v)).collect();
        self.apply(&cells)
    }
}

// ---------------------------------------------------------------------------
// Linear trend
// ---------------------------------------------------------------------------

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    pub points: usize,
}

impl LinearTrend {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fits an OLS line through `(xs[i], ys[i])`.
///
/// Returns `None` if the slices differ in length, hold fewer than two
/// points, or all `xs` are equal.
pub fn fit_linear_trend(xs: &[f64], ys: &[f64]) -> Option<LinearTrend> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some(LinearTrend {
        slope,
        intercept: mean_y - slope * mean_x,
        points: xs.len(),
    })
}

/// Trend of annual counts against the year.
pub fn fit_annual_trend(counts: &[AnnualCount]) -> Option<LinearTrend> {
    let xs: Vec<f64> = counts.iter().map(|c| f64::from(c.year)).collect();
    let ys: Vec<f64> = counts.iter().map(|c| c.count as f64).collect();
    fit_linear_trend(&xs, &ys)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

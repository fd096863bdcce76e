/// Ridge (peak) and trough detection on the concatenated series.
///
/// One detector serves every analysis; the caller picks exactly one filter
/// mode per call. Troughs are the peaks of the negated sequence.
///
/// # Boundary policy
/// Endpoints are excluded: the first and last samples can never be a peak
/// or trough, because one side of them is unobserved. A flat-topped maximum
/// (plateau) is reported once, at its middle sample, rounding toward the
/// left for even widths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::analysis::calendar::{self, CalendarTag};
use crate::model::{AnalysisError, Observation};

// ---------------------------------------------------------------------------
// Filter modes
// ---------------------------------------------------------------------------

/// How candidate local maxima are filtered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum PeakFilter {
    /// Keep candidates whose prominence is at least this value.
    Prominence(f64),
    /// Keep candidates whose value is at least this height. For troughs the
    /// height applies to the negated sequence.
    Height(f64),
    /// `Height` with the threshold set to the mean of the scanned sequence.
    HeightAboveMean,
    /// Keep candidates at least this many samples apart, larger values first.
    Distance(usize),
}

impl fmt::Display for PeakFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeakFilter::Prominence(p) => write!(f, "prominence >= {}", p),
            PeakFilter::Height(h) => write!(f, "height >= {}", h),
            PeakFilter::HeightAboveMean => write!(f, "height >= series mean"),
            PeakFilter::Distance(d) => write!(f, "distance >= {}", d),
        }
    }
}

impl PeakFilter {
    fn validate(&self) -> Result<(), AnalysisError> {
        match *self {
            PeakFilter::Prominence(p) if !p.is_finite() || p < 0.0 => Err(
                AnalysisError::InvalidParameter(format!("prominence must be >= 0, got {}", p)),
            ),
            PeakFilter::Height(h) if !h.is_finite() => Err(AnalysisError::InvalidParameter(
                format!("height must be finite, got {}", h),
            )),
            PeakFilter::Distance(0) => Err(AnalysisError::InvalidParameter(
                "distance must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Indices of local maxima of `values` that pass `filter`, strictly increasing.
pub fn find_peaks(values: &[f64], filter: PeakFilter) -> Result<Vec<usize>, AnalysisError> {
    filter.validate()?;
    let candidates = local_maxima(values);

    let peaks = match filter {
        PeakFilter::Prominence(min) => candidates
            .into_iter()
            .filter(|&p| prominence(values, p) >= min)
            .collect(),
        PeakFilter::Height(min) => candidates
            .into_iter()
            .filter(|&p| values[p] >= min)
            .collect(),
        PeakFilter::HeightAboveMean => match finite_mean(values) {
            Some(mean) => candidates
                .into_iter()
                .filter(|&p| values[p] >= mean)
                .collect(),
            None => Vec::new(),
        },
        PeakFilter::Distance(distance) => select_by_distance(values, &candidates, distance),
    };

    Ok(peaks)
}

/// Indices of local minima of `values` that pass `filter`, strictly increasing.
///
/// Equivalent to running [`find_peaks`] on the negated sequence.
pub fn find_troughs(values: &[f64], filter: PeakFilter) -> Result<Vec<usize>, AnalysisError> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    find_peaks(&negated, filter)
}

/// Interior samples strictly higher than their left neighbour and higher
/// than the first differing sample to their right.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                peaks.push((i + i_ahead - 1) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Vertical drop from `x[peak]` to the higher of the two minima found by
/// scanning outward until a strictly higher sample or the series end.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    let mut i = peak;
    loop {
        if x[i] > height {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = height;
    for &v in &x[peak..] {
        if v > height {
            break;
        }
        if v < right_min {
            right_min = v;
        }
    }

    height - left_min.max(right_min)
}

fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    // Highest first; equal heights resolve to the later peak, as scipy's
    // reversed walk over a stable argsort does.
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        x[peaks[b]]
            .partial_cmp(&x[peaks[a]])
            .unwrap_or(Ordering::Equal)
            .then(b.cmp(&a))
    });

    let mut keep = vec![true; peaks.len()];
    for &i in &order {
        if !keep[i] {
            continue;
        }
        let mut k = i;
        while k > 0 {
            k -= 1;
            if peaks[i] - peaks[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in i + 1..peaks.len() {
            if peaks[k] - peaks[i] >= distance {
                break;
            }
            keep[k] = false;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

fn finite_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

// ---------------------------------------------------------------------------
// Tagged features
// ---------------------------------------------------------------------------

/// A detected peak or trough with its calendar attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub index: usize,
    pub time: DateTime<Utc>,
    pub value: f64,
    pub calendar: CalendarTag,
}

/// Looks up and calendar-tags the observations at `indices`.
///
/// Indices past the end of `observations` are skipped.
pub fn tag_features(observations: &[Observation], indices: &[usize]) -> Vec<Feature> {
    indices
        .iter()
        .filter_map(|&index| {
            observations.get(index).map(|obs| Feature {
                index,
                time: obs.time,
                value: obs.value,
                calendar: calendar::tag(&obs.time),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

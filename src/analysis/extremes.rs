/// Percentile-based extreme-event detection.
///
/// Thresholds come from the series itself, so "extreme" always means
/// "extreme relative to the study period".

use serde::{Deserialize, Serialize};

use crate::model::{AnalysisError, Observation};

/// Percentile pair used when none is configured.
pub const DEFAULT_LOWER_PERCENTILE: f64 = 5.0;
pub const DEFAULT_UPPER_PERCENTILE: f64 = 95.0;

/// Classification of a single point against the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtremeClass {
    /// At or below the lower threshold (deep trough).
    Low,
    Normal,
    /// At or above the upper threshold (strong ridge).
    High,
}

/// The two threshold values computed over a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremeThresholds {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ExtremeThresholds {
    /// Classifies `value`. Both bounds are inclusive; if a value satisfies
    /// both (a constant series) it is `High`.
    pub fn classify(&self, value: f64) -> ExtremeClass {
        if value >= self.upper {
            ExtremeClass::High
        } else if value <= self.lower {
            ExtremeClass::Low
        } else {
            ExtremeClass::Normal
        }
    }
}

/// The `q`-th percentile (0–100) of `values`, interpolating linearly
/// between the two closest ranks. Non-finite values are ignored.
///
/// Returns `None` if no finite values remain.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// `InvalidParameter` unless `0 <= lower <= upper <= 100`. Equal percentiles
/// are allowed; every value then classifies High or Low.
pub fn check_percentile_pair(lower: f64, upper: f64) -> Result<(), AnalysisError> {
    if (0.0..=100.0).contains(&lower) && (0.0..=100.0).contains(&upper) && lower <= upper {
        Ok(())
    } else {
        Err(AnalysisError::InvalidParameter(format!(
            "percentile pair must satisfy 0 <= lower <= upper <= 100, got ({}, {})",
            lower, upper
        )))
    }
}

/// Computes the lower/upper thresholds for a percentile pair.
///
/// Returns `Ok(None)` for a series with no finite values; the pair is
/// checked with [`check_percentile_pair`].
pub fn compute_thresholds(
    values: &[f64],
    lower_percentile: f64,
    upper_percentile: f64,
) -> Result<Option<ExtremeThresholds>, AnalysisError> {
    check_percentile_pair(lower_percentile, upper_percentile)?;

    let lower = percentile(values, lower_percentile);
    let upper = percentile(values, upper_percentile);
    Ok(lower.zip(upper).map(|(lower, upper)| ExtremeThresholds {
        lower_percentile,
        upper_percentile,
        lower,
        upper,
    }))
}

/// Observations split by class, in series order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtremeEvents {
    pub highs: Vec<Observation>,
    pub lows: Vec<Observation>,
}

/// Partitions the extreme observations out of `observations`.
pub fn find_extremes(
    observations: &[Observation],
    thresholds: &ExtremeThresholds,
) -> ExtremeEvents {
    let mut events = ExtremeEvents::default();
    for obs in observations {
        match thresholds.classify(obs.value) {
            ExtremeClass::High => events.highs.push(*obs),
            ExtremeClass::Low => events.lows.push(*obs),
            ExtremeClass::Normal => {}
        }
    }
    events
}

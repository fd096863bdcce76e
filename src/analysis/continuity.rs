/// Calendar-continuity diagnostics for a concatenated series.
///
/// Concatenation trusts the caller to supply a clean, ordered year range.
/// When that trust is misplaced (a year listed twice, years out of order,
/// a missing file silently skipped upstream) the series still concatenates
/// but every calendar grouping downstream is quietly wrong. This module
/// reports those problems; it never reorders or drops anything.
///
/// # Expected step
/// All checks take the expected sampling interval explicitly (one day for
/// daily means, six hours for 4x-daily files) rather than inferring it, so
/// the result is deterministic for short or irregular test series.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::model::Observation;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A jump between consecutive samples larger than the expected step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// Index of the sample after the gap.
    pub index: usize,
    /// Missing time between the two samples, in minutes, beyond one step.
    pub missing_minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityReport {
    /// Indices whose timestamp is earlier than the previous sample's.
    pub out_of_order: Vec<usize>,
    /// Indices whose timestamp equals the previous sample's.
    pub duplicates: Vec<usize>,
    pub gaps: Vec<Gap>,
}

impl ContinuityReport {
    pub fn is_continuous(&self) -> bool {
        self.out_of_order.is_empty() && self.duplicates.is_empty() && self.gaps.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Continuity check
// ---------------------------------------------------------------------------

/// Compares each timestamp with its predecessor.
///
/// A step larger than `expected_step` is a gap; a step exactly equal is
/// continuous. Zero is a duplicate and negative is out of order.
pub fn check_continuity(observations: &[Observation], expected_step: Duration) -> ContinuityReport {
    let mut report = ContinuityReport::default();

    for (i, pair) in observations.windows(2).enumerate() {
        let index = i + 1;
        let step = pair[1].time - pair[0].time;

        if step < Duration::zero() {
            report.out_of_order.push(index);
        } else if step == Duration::zero() {
            report.duplicates.push(index);
        } else if step > expected_step {
            report.gaps.push(Gap {
                index,
                missing_minutes: (step - expected_step).num_minutes(),
            });
        }
    }

    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Feature extraction and aggregation over the extracted height series.
///
/// Every function here is a pure function of the series (or of its tagged
/// features) and returns freshly built results.
///
/// Submodules:
/// - `concat` — appends per-year series in the order given.
/// - `calendar` — year / month / season tagging.
/// - `peaks` — ridge and trough detection with one filter mode per call.
/// - `extremes` — percentile thresholds and extreme-event classification.
/// - `aggregate` — grouping reductions, moving averages, linear trends.
/// - `resample` — daily / weekly / monthly mean resampling.
/// - `continuity` — read-only checks for duplicated, missing or misordered time steps.
/// - `stats` — descriptive statistics for summaries.

pub mod aggregate;
pub mod calendar;
pub mod concat;
pub mod continuity;
pub mod extremes;
pub mod peaks;
pub mod resample;
pub mod stats;

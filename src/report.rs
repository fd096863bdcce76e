/// Analyses over a loaded series and their reports.
///
/// Each `analyze_*` function bundles the feature-extraction steps of one
/// study into a serializable report. `AnalysisReport` gathers whichever
/// reports were run and can be written as pretty JSON; the `print_*`
/// functions render the console summaries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::aggregate::{
    AnnualCount, AnnualMean, LinearTrend, RollingMean, SeasonalTable, count_by_year,
    fit_annual_trend, mean_by_year,
};
use crate::analysis::calendar::{self, CalendarTag, Season};
use crate::analysis::continuity::ContinuityReport;
use crate::analysis::extremes::{
    ExtremeEvents, ExtremeThresholds, compute_thresholds, find_extremes,
};
use crate::analysis::peaks::{Feature, PeakFilter, find_peaks, find_troughs, tag_features};
use crate::analysis::resample::{ResampleFrequency, resample_mean};
use crate::analysis::stats::{SeriesStats, stats_by_year};
use crate::extract::PointQuery;
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, ConcatenatedSeries, GridCell};

// ============================================================================
// Report types
// ============================================================================

/// Ridge / trough study: feature lists, seasonal tables and annual trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakReport {
    pub filter: PeakFilter,
    pub peaks: Vec<Feature>,
    pub troughs: Vec<Feature>,
    pub peak_seasons: SeasonalTable,
    pub trough_seasons: SeasonalTable,
    pub peak_seasons_smoothed: SeasonalTable,
    pub trough_seasons_smoothed: SeasonalTable,
    pub annual_peak_counts: Vec<AnnualCount>,
    /// Moving average of `annual_peak_counts`, aligned with it.
    pub annual_peak_counts_smoothed: Vec<Option<f64>>,
    /// Peaks per year against year; `None` with fewer than two years.
    pub peak_count_trend: Option<LinearTrend>,
    /// Mean height of the peaks in each year.
    pub annual_peak_intensity: Vec<AnnualMean>,
}

/// Percentile-extreme study on the (optionally resampled) series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeReport {
    pub resample: Option<ResampleFrequency>,
    /// Length of the series the thresholds were computed on.
    pub sample_count: usize,
    /// `None` when the series had no finite values.
    pub thresholds: Option<ExtremeThresholds>,
    pub high_count: usize,
    pub low_count: usize,
    pub events: ExtremeEvents,
    pub annual_event_counts: Vec<AnnualCount>,
    pub event_count_trend: Option<LinearTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub observations: usize,
    pub overall: Option<SeriesStats>,
    pub by_year: BTreeMap<i32, SeriesStats>,
    pub continuity: ContinuityReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub requested_latitude: f64,
    pub requested_longitude: f64,
    pub requested_level: f64,
    /// Cell selected in the first loaded year.
    pub cell: Option<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub target: TargetSummary,
    pub start_year: i32,
    pub end_year: i32,
    pub series: SeriesReport,
    pub peaks: Option<PeakReport>,
    pub extremes: Option<ExtremeReport>,
}

impl AnalysisReport {
    pub fn new(
        query: &PointQuery,
        years: (i32, i32),
        loaded: &ConcatenatedSeries,
        series: SeriesReport,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            target: TargetSummary {
                requested_latitude: query.latitude,
                requested_longitude: query.longitude,
                requested_level: query.level,
                cell: loaded.cells.first().copied(),
            },
            start_year: years.0,
            end_year: years.1,
            series,
            peaks: None,
            extremes: None,
        }
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), AnalysisError> {
        fs::write(path, self.to_json()?)?;
        logging::info(
            Stage::Report,
            None,
            &format!("Report written to {}", path.display()),
        );
        Ok(())
    }
}

// ============================================================================
// Analyses
// ============================================================================

pub fn analyze_series(series: &ConcatenatedSeries, continuity: ContinuityReport) -> SeriesReport {
    SeriesReport {
        observations: series.len(),
        overall: SeriesStats::compute(&series.values()),
        by_year: stats_by_year(&series.observations),
        continuity,
    }
}

/// Peaks and troughs under `filter`, their seasonal and annual aggregates.
pub fn analyze_peaks(
    series: &ConcatenatedSeries,
    filter: PeakFilter,
    rolling: &RollingMean,
) -> Result<PeakReport, AnalysisError> {
    let values = series.values();
    let peaks = tag_features(&series.observations, &find_peaks(&values, filter)?);
    let troughs = tag_features(&series.observations, &find_troughs(&values, filter)?);
    logging::info(
        Stage::Features,
        None,
        &format!("{} peaks, {} troughs ({})", peaks.len(), troughs.len(), filter),
    );

    let peak_seasons = SeasonalTable::from_tags(peaks.iter().map(|f| &f.calendar));
    let trough_seasons = SeasonalTable::from_tags(troughs.iter().map(|f| &f.calendar));

    let annual_peak_counts = count_by_year(peaks.iter().map(|f| &f.calendar));
    let counts: Vec<Option<f64>> = annual_peak_counts
        .iter()
        .map(|c| Some(c.count as f64))
        .collect();

    Ok(PeakReport {
        filter,
        peak_seasons_smoothed: peak_seasons.smoothed(rolling),
        trough_seasons_smoothed: trough_seasons.smoothed(rolling),
        annual_peak_counts_smoothed: rolling.apply(&counts),
        peak_count_trend: fit_annual_trend(&annual_peak_counts),
        annual_peak_intensity: mean_by_year(peaks.iter().map(|f| (f.calendar.year, f.value))),
        annual_peak_counts,
        peak_seasons,
        trough_seasons,
        peaks,
        troughs,
    })
}

/// Percentile thresholds and the events beyond them.
pub fn analyze_extremes(
    series: &ConcatenatedSeries,
    lower_percentile: f64,
    upper_percentile: f64,
    resample: Option<ResampleFrequency>,
) -> Result<ExtremeReport, AnalysisError> {
    let resampled;
    let observations = match resample {
        Some(freq) => {
            resampled = resample_mean(&series.observations, freq);
            &resampled[..]
        }
        None => &series.observations[..],
    };

    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let thresholds = compute_thresholds(&values, lower_percentile, upper_percentile)?;
    let events = match &thresholds {
        Some(t) => find_extremes(observations, t),
        None => {
            logging::warn(Stage::Features, None, "no finite values; no extreme thresholds");
            ExtremeEvents::default()
        }
    };

    let tags: Vec<CalendarTag> = events
        .highs
        .iter()
        .chain(&events.lows)
        .map(|o| calendar::tag(&o.time))
        .collect();
    let annual_event_counts = count_by_year(&tags);

    Ok(ExtremeReport {
        resample,
        sample_count: observations.len(),
        thresholds,
        high_count: events.highs.len(),
        low_count: events.lows.len(),
        event_count_trend: fit_annual_trend(&annual_event_counts),
        annual_event_counts,
        events,
    })
}

// ============================================================================
// Console output
// ============================================================================

fn rule() -> String {
    "═".repeat(60)
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:>8.1}", v),
        None => format!("{:>8}", "-"),
    }
}

/// Renders a year × season table; empty buckets show as `-`.
pub fn format_seasonal_table(table: &SeasonalTable) -> String {
    if table.is_empty() {
        return "  (no features)\n".to_string();
    }
    let seasons: Vec<Season> = table.columns.keys().copied().collect();
    let mut out = format!("{:>6}", "Year");
    for s in &seasons {
        out.push_str(&format!("{:>8}", s.to_string()));
    }
    out.push('\n');
    for &year in &table.years {
        out.push_str(&format!("{:>6}", year));
        for &s in &seasons {
            out.push_str(&cell(table.get(year, s)));
        }
        out.push('\n');
    }
    out
}

fn trend_line(trend: &Option<LinearTrend>, unit: &str) -> String {
    match trend {
        Some(t) => format!("{:+.4} {} per year ({} years)", t.slope, unit, t.points),
        None => "n/a (fewer than two years)".to_string(),
    }
}

pub fn print_series_summary(report: &AnalysisReport) {
    println!("\n{}", rule());
    println!("500 hPa HEIGHT SERIES {}–{}", report.start_year, report.end_year);
    println!("{}", rule());
    let t = &report.target;
    println!(
        "Requested: ({:.4}, {:.4}) @ {} hPa",
        t.requested_latitude, t.requested_longitude, t.requested_level
    );
    if let Some(c) = &t.cell {
        println!("Grid cell: ({:.2}, {:.2}) @ {} hPa", c.latitude, c.longitude, c.level);
    }
    let s = &report.series;
    println!("Observations: {}", s.observations);
    if let Some(overall) = &s.overall {
        print!("{}", overall.report("Overall"));
    }
    if !s.continuity.is_continuous() {
        println!(
            "⚠ Continuity: {} out of order, {} duplicated, {} gap(s)",
            s.continuity.out_of_order.len(),
            s.continuity.duplicates.len(),
            s.continuity.gaps.len()
        );
    }
}

pub fn print_yearly_stats(report: &SeriesReport) {
    println!("\n{:>6}{:>7}{:>10}{:>10}{:>10}{:>9}", "Year", "N", "Min", "Mean", "Max", "Std");
    for (year, s) in &report.by_year {
        println!(
            "{:>6}{:>7}{:>10.1}{:>10.1}{:>10.1}{:>9.1}",
            year, s.count, s.min, s.mean, s.max, s.std_dev
        );
    }
}

pub fn print_peak_summary(report: &PeakReport) {
    println!("\n{}", rule());
    println!("RIDGES AND TROUGHS ({})", report.filter);
    println!("{}", rule());
    println!("Peaks: {}   Troughs: {}", report.peaks.len(), report.troughs.len());
    println!("\nPeaks per season:");
    print!("{}", format_seasonal_table(&report.peak_seasons));
    println!("\nPeaks per season (moving average):");
    print!("{}", format_seasonal_table(&report.peak_seasons_smoothed));
    println!("\nTroughs per season:");
    print!("{}", format_seasonal_table(&report.trough_seasons));
    println!("\nTroughs per season (moving average):");
    print!("{}", format_seasonal_table(&report.trough_seasons_smoothed));

    println!("\n{:>6}{:>8}{:>10}{:>12}", "Year", "Peaks", "Smoothed", "Intensity");
    for (i, count) in report.annual_peak_counts.iter().enumerate() {
        let intensity = report
            .annual_peak_intensity
            .iter()
            .find(|m| m.year == count.year)
            .map(|m| format!("{:>12.1}", m.mean))
            .unwrap_or_else(|| format!("{:>12}", "-"));
        let smoothed = report.annual_peak_counts_smoothed.get(i).copied().flatten();
        println!("{:>6}{:>8}{:>10}{}", count.year, count.count, cell(smoothed), intensity);
    }
    println!("\nPeak count trend: {}", trend_line(&report.peak_count_trend, "peaks"));
}

pub fn print_extreme_summary(report: &ExtremeReport) {
    println!("\n{}", rule());
    match report.resample {
        Some(freq) => println!("EXTREMES ({:?} means, {} samples)", freq, report.sample_count),
        None => println!("EXTREMES (raw series, {} samples)", report.sample_count),
    }
    println!("{}", rule());
    match &report.thresholds {
        Some(t) => {
            println!("Upper threshold (p{}): {:.2} m", t.upper_percentile, t.upper);
            println!("Lower threshold (p{}): {:.2} m", t.lower_percentile, t.lower);
        }
        None => println!("No thresholds (series has no finite values)"),
    }
    println!("High events: {}", report.high_count);
    println!("Low events:  {}", report.low_count);
    println!("\n{:>6}{:>8}", "Year", "Events");
    for c in &report.annual_event_counts {
        println!("{:>6}{:>8}", c.year, c.count);
    }
    println!("\nEvent count trend: {}", trend_line(&report.event_count_trend, "events"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Observation;
    use chrono::{DateTime, Duration, TimeZone};

    fn series_from(start: DateTime<Utc>, step: Duration, values: &[f64]) -> ConcatenatedSeries {
        ConcatenatedSeries {
            cells: Vec::new(),
            observations: values
                .iter()
                .enumerate()
                .map(|(i, &value)| Observation {
                    time: start + step * i as i32,
                    value,
                })
                .collect(),
        }
    }

    // --- Peaks ---

    #[test]
    fn test_peak_report_counts_by_season_and_year() {
        // Peaks at indices 1 (January) and 3 (July) of 1990, 5 (January 1991).
        let times = [
            Utc.with_ymd_and_hms(1989, 12, 31, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1990, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1990, 4, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1990, 7, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1990, 12, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1991, 1, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1991, 2, 1, 0, 0, 0).unwrap(),
        ];
        let values = [5500.0, 5600.0, 5500.0, 5800.0, 5500.0, 5700.0, 5500.0];
        let series = ConcatenatedSeries {
            cells: Vec::new(),
            observations: times
                .iter()
                .zip(values)
                .map(|(&time, value)| Observation { time, value })
                .collect(),
        };

        let rolling = RollingMean::new(5).unwrap();
        let report = analyze_peaks(&series, PeakFilter::Prominence(10.0), &rolling).unwrap();

        assert_eq!(report.peaks.iter().map(|f| f.index).collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(report.troughs.iter().map(|f| f.index).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(report.peak_seasons.get(1990, Season::Winter), Some(1.0));
        assert_eq!(report.peak_seasons.get(1990, Season::Summer), Some(1.0));
        assert_eq!(report.peak_seasons.get(1991, Season::Summer), None);
        assert_eq!(
            report.annual_peak_counts,
            vec![AnnualCount { year: 1990, count: 2 }, AnnualCount { year: 1991, count: 1 }]
        );
        assert_eq!(report.annual_peak_counts_smoothed, vec![Some(2.0), Some(1.5)]);
        assert_eq!(report.annual_peak_intensity[0].mean, 5700.0);
        let trend = report.peak_count_trend.unwrap();
        assert!((trend.slope + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_report_on_flat_series_is_empty_not_error() {
        let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let series = series_from(start, Duration::days(1), &[5600.0; 30]);
        let rolling = RollingMean::new(5).unwrap();
        let report = analyze_peaks(&series, PeakFilter::Distance(3), &rolling).unwrap();
        assert!(report.peaks.is_empty());
        assert!(report.peak_seasons.is_empty());
        assert!(report.peak_count_trend.is_none());
    }

    // --- Extremes ---

    #[test]
    fn test_extremes_on_one_to_hundred_find_five_each_side() {
        let start = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let series = series_from(start, Duration::days(1), &values);

        let report = analyze_extremes(&series, 5.0, 95.0, None).unwrap();
        assert_eq!(report.sample_count, 100);
        assert_eq!(report.high_count, 5);
        assert_eq!(report.low_count, 5);
        assert_eq!(report.annual_event_counts, vec![AnnualCount { year: 2001, count: 10 }]);
    }

    #[test]
    fn test_extremes_resample_weekly_first() {
        // Monday 2001-01-01: first bin ends Sunday 01-07.
        let start = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let values: Vec<f64> = (0..28).map(|d| 5500.0 + (d / 7) as f64 * 10.0).collect();
        let series = series_from(start, Duration::days(1), &values);

        let report = analyze_extremes(&series, 5.0, 95.0, Some(ResampleFrequency::Weekly)).unwrap();
        assert_eq!(report.sample_count, 4);
        assert_eq!(report.high_count, 1);
        assert_eq!(report.low_count, 1);
    }

    #[test]
    fn test_extremes_on_empty_series_has_no_thresholds() {
        let report = analyze_extremes(&ConcatenatedSeries::default(), 5.0, 95.0, None).unwrap();
        assert!(report.thresholds.is_none());
        assert_eq!(report.high_count + report.low_count, 0);
    }

    // --- Output ---

    #[test]
    fn test_seasonal_table_renders_missing_bucket_as_dash() {
        let tags = [
            calendar::tag(&Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap()),
            calendar::tag(&Utc.with_ymd_and_hms(1991, 7, 1, 0, 0, 0).unwrap()),
        ];
        let text = format_seasonal_table(&SeasonalTable::from_tags(&tags));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Winter") && lines[0].contains("Summer"));
        assert!(lines[1].starts_with("  1990") && lines[1].trim_end().ends_with('-'));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let start = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        let series = series_from(start, Duration::days(1), &[1.0, 3.0, 2.0]);
        let query = PointQuery {
            latitude: 40.0,
            longitude: 285.0,
            level: 500.0,
            wrap_longitude: true,
        };
        let mut report = AnalysisReport::new(
            &query,
            (2001, 2001),
            &series,
            analyze_series(&series, ContinuityReport::default()),
        );
        report.extremes = Some(analyze_extremes(&series, 5.0, 95.0, None).unwrap());

        let json = report.to_json().unwrap();
        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.series.observations, 3);
        assert_eq!(back.extremes.unwrap().high_count, 1);
    }
}

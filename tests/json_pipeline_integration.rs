/// Integration tests for the file-backed pipeline
///
/// Tests verify:
/// 1. Per-year JSON grids written to a temporary directory load back
/// 2. Nearest-cell extraction returns the exact cell values per step
/// 3. Years concatenate in the order requested
/// 4. A missing year aborts the run with NotFound
/// 5. The analyses and the JSON report run end to end on loaded data

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use hgt_analysis::analysis::aggregate::RollingMean;
use hgt_analysis::analysis::peaks::PeakFilter;
use hgt_analysis::extract::PointQuery;
use hgt_analysis::ingest::GridSource;
use hgt_analysis::ingest::json::{DEFAULT_JSON_PATTERN, JsonGridSource, write_json_grid};
use hgt_analysis::model::{AnalysisError, FIELD_HGT, GridDataset};
use hgt_analysis::pipeline::{diagnose_continuity, load_series};
use hgt_analysis::report::{self, AnalysisReport};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const LATS: [f64; 3] = [37.5, 40.0, 42.5];
const LONS: [f64; 3] = [282.5, 285.0, 287.5];
const LEVELS: [f64; 2] = [850.0, 500.0];

/// Value encodes the cell so the extracted series identifies it.
fn encoded(day: usize, level: usize, lat: usize, lon: usize) -> f64 {
    5000.0 + (level * 100 + lat * 10 + lon) as f64 + day as f64 * 0.001
}

fn year_grid(year: i32, days: usize) -> GridDataset {
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
    let times = (0..days).map(|d| start + Duration::days(d as i64)).collect();
    let mut values = Vec::new();
    for d in 0..days {
        for l in 0..LEVELS.len() {
            for y in 0..LATS.len() {
                for x in 0..LONS.len() {
                    values.push(encoded(d, l, y, x));
                }
            }
        }
    }
    GridDataset::new(
        FIELD_HGT,
        times,
        LEVELS.to_vec(),
        LATS.to_vec(),
        LONS.to_vec(),
        values,
    )
    .expect("consistent test grid")
}

fn write_years(years: &[i32], days: usize) -> (TempDir, JsonGridSource) {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = JsonGridSource::new(dir.path(), DEFAULT_JSON_PATTERN).expect("valid pattern");
    for &year in years {
        write_json_grid(&source.path_for(year), &year_grid(year, days)).expect("write grid");
    }
    (dir, source)
}

fn nyc() -> PointQuery {
    PointQuery {
        latitude: 40.7128,
        longitude: -74.0060,
        level: 500.0,
        wrap_longitude: true,
    }
}

// ---------------------------------------------------------------------------
// Loading and extraction
// ---------------------------------------------------------------------------

#[test]
fn test_json_grid_round_trips_through_directory() {
    let (_dir, source) = write_years(&[1979], 4);
    let ds = source.load(1979).expect("year should load");
    assert_eq!(ds.shape(), [4, 2, 3, 3]);
    assert_eq!(ds, year_grid(1979, 4));
}

#[test]
fn test_extracted_series_matches_nearest_cell_exactly() {
    let (_dir, source) = write_years(&[1980], 5);
    let series = load_series(&source, 1980..=1980, &nyc()).expect("load");

    // 40.71N -> 40.0 (index 1); -74.006E -> 285.994 -> 285.0 (index 1); 500 hPa index 1.
    let cell = series.cells[0];
    assert_eq!((cell.latitude, cell.longitude, cell.level), (40.0, 285.0, 500.0));
    assert_eq!(series.len(), 5);
    for (d, obs) in series.observations.iter().enumerate() {
        assert_eq!(obs.value, encoded(d, 1, 1, 1));
    }
}

#[test]
fn test_without_wrapping_negative_longitude_snaps_to_first_column() {
    let (_dir, source) = write_years(&[1980], 2);
    let mut query = nyc();
    query.wrap_longitude = false;
    let series = load_series(&source, 1980..=1980, &query).expect("load");
    assert_eq!(series.cells[0].lon_index, 0);
}

#[test]
fn test_years_concatenate_in_order() {
    let (_dir, source) = write_years(&[1979, 1980, 1981], 3);
    let series = load_series(&source, 1979..=1981, &nyc()).expect("load");
    assert_eq!(series.len(), 9);
    let years: Vec<i32> = series.times().iter().map(|t| t.year()).collect();
    assert_eq!(years, vec![1979, 1979, 1979, 1980, 1980, 1980, 1981, 1981, 1981]);
}

#[test]
fn test_short_years_show_up_as_gaps_not_errors() {
    let (_dir, source) = write_years(&[1979, 1980], 3);
    let series = load_series(&source, 1979..=1980, &nyc()).expect("load");
    let continuity = diagnose_continuity(&series, Duration::days(1));
    assert_eq!(continuity.gaps.len(), 1);
    assert_eq!(continuity.gaps[0].index, 3);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_missing_year_aborts_with_not_found() {
    let (_dir, source) = write_years(&[1979, 1981], 2);
    let err = load_series(&source, 1979..=1981, &nyc()).expect_err("1980 is missing");
    match err {
        AnalysisError::NotFound { year, path } => {
            assert_eq!(year, 1980);
            assert!(path.ends_with("hgt.1980.json"), "unexpected path {}", path);
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_absent_level_is_out_of_domain() {
    let (_dir, source) = write_years(&[1979], 2);
    let mut query = nyc();
    query.level = 700.0;
    let err = load_series(&source, 1979..=1979, &query).expect_err("700 hPa absent");
    assert!(matches!(err, AnalysisError::OutOfDomain { .. }), "got {:?}", err);
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn test_analyses_and_report_over_loaded_years() {
    let (dir, source) = write_years(&[1990, 1991], 40);
    let series = load_series(&source, 1990..=1991, &nyc()).expect("load");
    let continuity = diagnose_continuity(&series, Duration::days(1));

    let mut analysis = AnalysisReport::new(
        &nyc(),
        (1990, 1991),
        &series,
        report::analyze_series(&series, continuity),
    );
    // Values rise monotonically within each year: no interior peaks within
    // a year, one drop at the year boundary.
    let peaks = report::analyze_peaks(
        &series,
        PeakFilter::Prominence(0.0),
        &RollingMean::new(5).unwrap(),
    )
    .expect("peaks");
    assert_eq!(peaks.peaks.len(), 1);
    assert_eq!(peaks.peaks[0].index, 39);
    analysis.peaks = Some(peaks);
    analysis.extremes = Some(report::analyze_extremes(&series, 5.0, 95.0, None).expect("extremes"));

    let path = dir.path().join("report.json");
    analysis.write_json(&path).expect("write report");
    let text = std::fs::read_to_string(&path).expect("read report");
    let back: AnalysisReport = serde_json::from_str(&text).expect("parse report");
    assert_eq!(back.series.observations, 80);
    assert_eq!(back.target.cell.map(|c| c.latitude), Some(40.0));
    assert_eq!(back.series.by_year.len(), 2);
}

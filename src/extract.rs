/// Point extraction: nearest-grid-cell selection and the location series.
///
/// Each axis is matched independently. No interpolation happens anywhere;
/// the series is the raw value of one cell at every time step.

use chrono::Datelike;

use crate::logging::{self, Stage};
use crate::model::{
    AnalysisError, GridCell, GridDataset, LocationSeries, Observation, LEVEL_TOLERANCE_HPA,
};

/// A target point on the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub level: f64,
    /// Shift the target longitude into the grid's convention (0–360 vs ±180)
    /// before matching.
    pub wrap_longitude: bool,
}

// ---------------------------------------------------------------------------
// Axis selection
// ---------------------------------------------------------------------------

/// Index of the axis value closest to `target`.
///
/// Tie-break: a candidate only replaces the current best when its distance
/// is strictly smaller, so among equidistant values the first one wins.
/// NaN axis entries are never selected. Returns `None` for an empty axis.
pub fn nearest_index(axis: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &value) in axis.iter().enumerate() {
        let distance = (value - target).abs();
        if distance.is_nan() {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// Expresses `target` in the same longitude convention as `axis`.
///
/// An axis with any value above 180° is treated as 0–360; anything else as
/// -180–180.
pub fn normalize_longitude(axis: &[f64], target: f64) -> f64 {
    if axis.iter().any(|&x| x > 180.0) {
        target.rem_euclid(360.0)
    } else if target > 180.0 {
        target - 360.0
    } else {
        target
    }
}

/// Resolves the query against the dataset's axes without reading any values.
pub fn select_cell(dataset: &GridDataset, query: &PointQuery) -> Result<GridCell, AnalysisError> {
    for (name, value) in [
        ("latitude", query.latitude),
        ("longitude", query.longitude),
        ("level", query.level),
    ] {
        if !value.is_finite() {
            return Err(AnalysisError::InvalidParameter(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
    }

    let level_index = nearest_index(&dataset.levels, query.level)
        .filter(|&i| (dataset.levels[i] - query.level).abs() <= LEVEL_TOLERANCE_HPA)
        .ok_or_else(|| AnalysisError::OutOfDomain {
            axis: "level".to_string(),
            requested: query.level,
        })?;

    let lat_index =
        nearest_index(&dataset.latitudes, query.latitude).ok_or_else(|| AnalysisError::OutOfDomain {
            axis: "latitude".to_string(),
            requested: query.latitude,
        })?;

    let target_lon = if query.wrap_longitude {
        normalize_longitude(&dataset.longitudes, query.longitude)
    } else {
        query.longitude
    };
    let lon_index =
        nearest_index(&dataset.longitudes, target_lon).ok_or_else(|| AnalysisError::OutOfDomain {
            axis: "longitude".to_string(),
            requested: query.longitude,
        })?;

    Ok(GridCell {
        latitude: dataset.latitudes[lat_index],
        longitude: dataset.longitudes[lon_index],
        level: dataset.levels[level_index],
        lat_index,
        lon_index,
        level_index,
    })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extracts the time series at the cell nearest to `query`.
///
/// The output has exactly one observation per time step of `dataset`.
/// Fails with `OutOfDomain` when the requested level is not on the level
/// axis (within `LEVEL_TOLERANCE_HPA`) or a horizontal axis is empty.
pub fn extract_point(
    dataset: &GridDataset,
    query: &PointQuery,
) -> Result<LocationSeries, AnalysisError> {
    let cell = select_cell(dataset, query)?;

    logging::debug(
        Stage::Extractor,
        dataset.times.first().map(|t| t.year()),
        &format!(
            "requested ({:.4}, {:.4}) @ {} hPa -> cell ({}, {}) @ {} hPa",
            query.latitude, query.longitude, query.level, cell.latitude, cell.longitude, cell.level
        ),
    );

    let observations = dataset
        .times
        .iter()
        .enumerate()
        .map(|(t, &time)| Observation {
            time,
            value: dataset.value_at(t, cell.level_index, cell.lat_index, cell.lon_index),
        })
        .collect();

    Ok(LocationSeries { cell, observations })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FIELD_HGT;
    use chrono::{Duration, TimeZone, Utc};

    /// 3 days × levels [850, 500] × lats [45, 42.5, 40] × lons [282.5, 285, 287.5].
    /// Each value encodes its indices so the chosen cell is visible.
    fn sample_dataset() -> GridDataset {
        let start = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
        let times: Vec<_> = (0..3).map(|d| start + Duration::days(d)).collect();
        let levels = vec![850.0, 500.0];
        let lats = vec![45.0, 42.5, 40.0];
        let lons = vec![282.5, 285.0, 287.5];
        let mut values = Vec::new();
        for t in 0..3 {
            for l in 0..2 {
                for y in 0..3 {
                    for x in 0..3 {
                        values.push((t * 1000 + l * 100 + y * 10 + x) as f64);
                    }
                }
            }
        }
        GridDataset::new(FIELD_HGT, times, levels, lats, lons, values).unwrap()
    }

    fn query(latitude: f64, longitude: f64, level: f64) -> PointQuery {
        PointQuery {
            latitude,
            longitude,
            level,
            wrap_longitude: true,
        }
    }

    // --- nearest_index ------------------------------------------------------

    #[test]
    fn test_nearest_index_picks_closest_value() {
        assert_eq!(nearest_index(&[0.0, 2.5, 5.0, 7.5], 5.9), Some(2));
        assert_eq!(nearest_index(&[90.0, 87.5, 85.0], 86.0), Some(2));
    }

    #[test]
    fn test_nearest_index_tie_goes_to_first_occurrence() {
        // 1.25 is exactly halfway between 0.0 and 2.5.
        assert_eq!(nearest_index(&[0.0, 2.5], 1.25), Some(0));
        // Descending axis: still the first in axis order.
        assert_eq!(nearest_index(&[2.5, 0.0], 1.25), Some(0));
    }

    #[test]
    fn test_nearest_index_empty_axis_is_none() {
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_nearest_index_skips_nan_entries() {
        assert_eq!(nearest_index(&[f64::NAN, 10.0], 0.0), Some(1));
    }

    // --- Longitude conventions ----------------------------------------------

    #[test]
    fn test_negative_longitude_wraps_onto_0_360_axis() {
        let axis = [0.0, 90.0, 180.0, 270.0, 357.5];
        let wrapped = normalize_longitude(&axis, -74.006);
        assert!((wrapped - 285.994).abs() < 1e-9, "got {}", wrapped);
    }

    #[test]
    fn test_longitude_above_180_wraps_onto_signed_axis() {
        let axis = [-180.0, -90.0, 0.0, 90.0];
        assert!((normalize_longitude(&axis, 285.994) - (-74.006)).abs() < 1e-9);
        assert_eq!(normalize_longitude(&axis, -74.0), -74.0);
    }

    #[test]
    fn test_wrap_disabled_uses_raw_longitude() {
        let ds = sample_dataset();
        let mut q = query(40.7128, -74.006, 500.0);
        q.wrap_longitude = false;
        // Raw -74 is nearest to the smallest longitude on the axis.
        let cell = select_cell(&ds, &q).unwrap();
        assert_eq!(cell.lon_index, 0);
    }

    // --- extract_point ------------------------------------------------------

    #[test]
    fn test_extract_returns_exact_values_of_nearest_cell() {
        let ds = sample_dataset();
        // NYC: lat 40.7128 -> 40.0 (index 2); lon -74.006 -> 285.994 -> 285.0 (index 1).
        let series = extract_point(&ds, &query(40.7128, -74.006, 500.0)).expect("should extract");

        assert_eq!(series.cell.lat_index, 2);
        assert_eq!(series.cell.lon_index, 1);
        assert_eq!(series.cell.level_index, 1);
        assert_eq!(series.cell.latitude, 40.0);
        assert_eq!(series.cell.longitude, 285.0);

        let values: Vec<f64> = series.observations.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![121.0, 1121.0, 2121.0]);
    }

    #[test]
    fn test_extract_output_length_matches_time_steps() {
        let ds = sample_dataset();
        let series = extract_point(&ds, &query(44.0, 282.0, 850.0)).unwrap();
        assert_eq!(series.observations.len(), ds.time_steps());
        assert_eq!(series.observations[0].time, ds.times[0]);
    }

    #[test]
    fn test_missing_level_is_out_of_domain() {
        let ds = sample_dataset();
        let result = extract_point(&ds, &query(40.0, 285.0, 700.0));
        assert_eq!(
            result,
            Err(AnalysisError::OutOfDomain {
                axis: "level".to_string(),
                requested: 700.0
            })
        );
    }

    #[test]
    fn test_level_within_tolerance_is_accepted() {
        let ds = sample_dataset();
        let series = extract_point(&ds, &query(40.0, 285.0, 500.2)).unwrap();
        assert_eq!(series.cell.level, 500.0);
    }

    #[test]
    fn test_non_finite_target_is_invalid_parameter() {
        let ds = sample_dataset();
        let result = extract_point(&ds, &query(f64::NAN, 285.0, 500.0));
        assert!(matches!(result, Err(AnalysisError::InvalidParameter(_))));
    }
}

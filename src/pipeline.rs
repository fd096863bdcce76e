/// Multi-year loading: open a source, then load, slice and concatenate years.
///
/// Years are processed strictly one at a time. Each year's dataset is
/// dropped as soon as its location series has been extracted, so memory
/// stays bounded by one grid plus the growing series. The first failure
/// aborts the run; there are no retries.

use std::ops::RangeInclusive;

use chrono::Duration;

use crate::analysis::concat::concatenate;
use crate::analysis::continuity::{ContinuityReport, check_continuity};
use crate::config::{DataConfig, DataFormat};
use crate::extract::{PointQuery, extract_point};
use crate::ingest::GridSource;
use crate::ingest::json::JsonGridSource;
use crate::logging::{self, Stage};
use crate::model::{AnalysisError, ConcatenatedSeries};
use crate::synthetic::SyntheticGridSource;

// ---------------------------------------------------------------------------
// Source selection
// ---------------------------------------------------------------------------

/// Builds the grid source named by the `[data]` configuration.
pub fn open_source(data: &DataConfig) -> Result<Box<dyn GridSource>, AnalysisError> {
    match data.format {
        DataFormat::Json => Ok(Box::new(JsonGridSource::new(
            &data.dir,
            data.file_pattern(),
        )?)),
        DataFormat::Synthetic => Ok(Box::new(SyntheticGridSource::new())),
        DataFormat::Netcdf => open_netcdf(data),
    }
}

#[cfg(feature = "netcdf")]
fn open_netcdf(data: &DataConfig) -> Result<Box<dyn GridSource>, AnalysisError> {
    use crate::ingest::nc::NetcdfGridSource;
    Ok(Box::new(
        NetcdfGridSource::new(&data.dir, data.file_pattern())?.with_field(data.field.clone()),
    ))
}

#[cfg(not(feature = "netcdf"))]
fn open_netcdf(_data: &DataConfig) -> Result<Box<dyn GridSource>, AnalysisError> {
    Err(AnalysisError::Config(
        "NetCDF input requires building with the `netcdf` feature; use format json or synthetic"
            .to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads every year in `years`, extracts the point series and concatenates
/// them in year order.
pub fn load_series(
    source: &dyn GridSource,
    years: RangeInclusive<i32>,
    query: &PointQuery,
) -> Result<ConcatenatedSeries, AnalysisError> {
    let total = years.clone().count();
    logging::info(
        Stage::Loader,
        None,
        &format!(
            "Loading {} year(s) {}..={} from {}",
            total,
            years.start(),
            years.end(),
            source.describe()
        ),
    );

    let mut parts = Vec::with_capacity(total);
    for year in years {
        let dataset = match source.load(year) {
            Ok(ds) => ds,
            Err(e) => {
                logging::log_year_failure(Stage::Loader, year, "load", &e);
                logging::log_load_aborted(total, parts.len(), year);
                return Err(e);
            }
        };

        let part = match extract_point(&dataset, query) {
            Ok(p) => p,
            Err(e) => {
                logging::log_year_failure(Stage::Extractor, year, "extract", &e);
                logging::log_load_aborted(total, parts.len(), year);
                return Err(e);
            }
        };
        drop(dataset);

        logging::debug(
            Stage::Loader,
            Some(year),
            &format!("{} observations", part.observations.len()),
        );
        parts.push(part);
    }

    let series = concatenate(parts);
    warn_on_cell_changes(&series);
    logging::log_load_summary(total, series.cells.len(), series.len());
    Ok(series)
}

/// Runs the continuity diagnostic and logs what it finds. Never alters the series.
pub fn diagnose_continuity(
    series: &ConcatenatedSeries,
    expected_step: Duration,
) -> ContinuityReport {
    let report = check_continuity(&series.observations, expected_step);
    if report.is_continuous() {
        logging::debug(Stage::Concat, None, "series is calendar-continuous");
        return report;
    }
    if !report.out_of_order.is_empty() {
        logging::warn(
            Stage::Concat,
            None,
            &format!(
                "{} timestamp(s) earlier than their predecessor (first at index {})",
                report.out_of_order.len(),
                report.out_of_order[0]
            ),
        );
    }
    if !report.duplicates.is_empty() {
        logging::warn(
            Stage::Concat,
            None,
            &format!("{} duplicated timestamp(s)", report.duplicates.len()),
        );
    }
    for gap in &report.gaps {
        logging::warn(
            Stage::Concat,
            None,
            &format!(
                "gap before index {}: {} minute(s) missing",
                gap.index, gap.missing_minutes
            ),
        );
    }
    report
}

/// Grids with different axes can resolve the same query to different cells.
fn warn_on_cell_changes(series: &ConcatenatedSeries) {
    if let Some(first) = series.cells.first() {
        let changed = series
            .cells
            .iter()
            .filter(|c| {
                c.latitude != first.latitude
                    || c.longitude != first.longitude
                    || c.level != first.level
            })
            .count();
        if changed > 0 {
            logging::warn(
                Stage::Concat,
                None,
                &format!("{} year(s) resolved to a different grid cell than the first", changed),
            );
        }
    }
}

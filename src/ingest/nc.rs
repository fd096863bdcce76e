/// NetCDF grid files (feature `netcdf`).
///
/// Reads NCEP/NCAR reanalysis-style files: one file per year holding a
/// `(time, level, lat, lon)` field plus 1-D coordinate variables. Packed
/// values are unpacked with `scale_factor` / `add_offset`, and
/// `_FillValue` / `missing_value` become NaN.
///
/// The file handle is dropped before `load` returns, so a loop over years
/// keeps only the current year open.

use std::path::{Path, PathBuf};

use ::netcdf::{AttributeValue, File, Variable};

use super::time_units::TimeUnits;
use super::{GridSource, grid_file_path, validate_pattern};
use crate::model::{AnalysisError, FIELD_HGT, GridDataset};

const TIME_NAMES: &[&str] = &["time"];
const LEVEL_NAMES: &[&str] = &["level", "lev", "plev"];
const LAT_NAMES: &[&str] = &["lat", "latitude"];
const LON_NAMES: &[&str] = &["lon", "longitude"];

pub struct NetcdfGridSource {
    dir: PathBuf,
    pattern: String,
    field: String,
}

impl NetcdfGridSource {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Result<Self, AnalysisError> {
        let pattern = pattern.into();
        validate_pattern(&pattern)?;
        Ok(Self {
            dir: dir.into(),
            pattern,
            field: FIELD_HGT.to_string(),
        })
    }

    /// Reads a different field than `hgt` from the same files.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        grid_file_path(&self.dir, &self.pattern, year)
    }
}

impl GridSource for NetcdfGridSource {
    fn load(&self, year: i32) -> Result<GridDataset, AnalysisError> {
        let path = self.path_for(year);
        if !path.exists() {
            return Err(AnalysisError::NotFound {
                year,
                path: path.display().to_string(),
            });
        }
        read_netcdf_grid(&path, &self.field)
    }

    fn describe(&self) -> String {
        format!("NetCDF grids {}", self.dir.join(&self.pattern).display())
    }
}

/// Opens one file and reads `field` with its coordinate axes.
pub fn read_netcdf_grid(path: &Path, field: &str) -> Result<GridDataset, AnalysisError> {
    let file = ::netcdf::open(path).map_err(|e| nc_error(path, e))?;

    let time_var = find_variable(&file, TIME_NAMES)?;
    let raw_times = read_axis(&time_var, path)?;
    let units = string_attribute(&time_var, "units").ok_or_else(|| {
        AnalysisError::InvalidDataset(format!("{}: time variable has no units", path.display()))
    })?;
    let times = TimeUnits::parse(&units)?.decode(&raw_times)?;

    let levels = read_axis(&find_variable(&file, LEVEL_NAMES)?, path)?;
    let latitudes = read_axis(&find_variable(&file, LAT_NAMES)?, path)?;
    let longitudes = read_axis(&find_variable(&file, LON_NAMES)?, path)?;

    let var = file.variable(field).ok_or_else(|| {
        AnalysisError::InvalidDataset(format!("{}: no variable '{}'", path.display(), field))
    })?;
    check_dimension_order(&var, path)?;

    let raw: Vec<f64> = var.get_values::<f64, _>(..).map_err(|e| nc_error(path, e))?;
    let values = unpack(&var, raw);

    GridDataset::new(field, times, levels, latitudes, longitudes, values)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn nc_error(path: &Path, err: ::netcdf::Error) -> AnalysisError {
    AnalysisError::Parse(format!("{}: {}", path.display(), err))
}

fn find_variable<'f>(file: &'f File, names: &[&str]) -> Result<Variable<'f>, AnalysisError> {
    names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| {
            AnalysisError::InvalidDataset(format!("missing coordinate {}", names.join(" or ")))
        })
}

fn read_axis(var: &Variable<'_>, path: &Path) -> Result<Vec<f64>, AnalysisError> {
    var.get_values::<f64, _>(..).map_err(|e| nc_error(path, e))
}

/// The field must be laid out `(time, level, lat, lon)` for row-major indexing.
fn check_dimension_order(var: &Variable<'_>, path: &Path) -> Result<(), AnalysisError> {
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let expected = [TIME_NAMES, LEVEL_NAMES, LAT_NAMES, LON_NAMES];
    let ok = dims.len() == expected.len()
        && dims
            .iter()
            .zip(expected.iter())
            .all(|(dim, names)| names.contains(&dim.as_str()));
    if ok {
        Ok(())
    } else {
        Err(AnalysisError::InvalidDataset(format!(
            "{}: expected dimensions (time, level, lat, lon), found ({})",
            path.display(),
            dims.join(", ")
        )))
    }
}

fn numeric_attribute(var: &Variable<'_>, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            AttributeValue::Double(d) => Some(d),
            AttributeValue::Float(f) => Some(f as f64),
            AttributeValue::Short(s) => Some(s as f64),
            AttributeValue::Int(i) => Some(i as f64),
            AttributeValue::Doubles(d) => d.first().copied(),
            AttributeValue::Floats(f) => f.first().map(|&x| x as f64),
            AttributeValue::Shorts(s) => s.first().map(|&x| x as f64),
            _ => None,
        })
}

fn string_attribute(var: &Variable<'_>, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

/// Applies packing attributes; fill and missing markers compare on the raw value.
fn unpack(var: &Variable<'_>, raw: Vec<f64>) -> Vec<f64> {
    let scale = numeric_attribute(var, "scale_factor").unwrap_or(1.0);
    let offset = numeric_attribute(var, "add_offset").unwrap_or(0.0);
    let markers: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| numeric_attribute(var, name))
        .collect();

    raw.into_iter()
        .map(|v| {
            if !v.is_finite() || markers.contains(&v) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect()
}

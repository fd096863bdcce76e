/// Core data types for the 500 hPa height analysis service.
///
/// This module defines the shared domain model imported by all other modules:
/// the per-year grid, the extracted location series, and the error type.
/// It contains no I/O; the only logic is shape validation and indexing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field and level constants
// ---------------------------------------------------------------------------

/// Name of the geopotential height field in NCEP reanalysis files.
pub const FIELD_HGT: &str = "hgt";

/// The mid-troposphere pressure surface studied by default, in hPa.
pub const LEVEL_500_HPA: f64 = 500.0;

/// A requested level must lie this close to an axis value to count as present.
pub const LEVEL_TOLERANCE_HPA: f64 = 0.5;

// ---------------------------------------------------------------------------
// Grid types
// ---------------------------------------------------------------------------

/// One year of a gridded field, indexed time × level × latitude × longitude.
///
/// Values are stored flat in row-major order (longitude varies fastest),
/// which is the layout NetCDF hands back for a `(time, level, lat, lon)`
/// variable. Construct through [`GridDataset::new`] so the shape is checked.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDataset {
    pub field: String,
    pub times: Vec<DateTime<Utc>>,
    pub levels: Vec<f64>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    values: Vec<f64>,
}

impl GridDataset {
    pub fn new(
        field: impl Into<String>,
        times: Vec<DateTime<Utc>>,
        levels: Vec<f64>,
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        values: Vec<f64>,
    ) -> Result<Self, AnalysisError> {
        let shape = [times.len(), levels.len(), latitudes.len(), longitudes.len()];
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                AnalysisError::InvalidDataset(format!("shape {:?} is too large to address", shape))
            })?;
        if values.len() != expected {
            return Err(AnalysisError::InvalidDataset(format!(
                "expected {} values for shape ({}, {}, {}, {}), got {}",
                expected,
                times.len(),
                levels.len(),
                latitudes.len(),
                longitudes.len(),
                values.len()
            )));
        }
        Ok(Self {
            field: field.into(),
            times,
            levels,
            latitudes,
            longitudes,
            values,
        })
    }

    /// Axis lengths as `[time, level, lat, lon]`.
    pub fn shape(&self) -> [usize; 4] {
        [
            self.times.len(),
            self.levels.len(),
            self.latitudes.len(),
            self.longitudes.len(),
        ]
    }

    pub fn time_steps(&self) -> usize {
        self.times.len()
    }

    /// Value at the given axis indices. Panics on out-of-range indices,
    /// like slice indexing.
    pub fn value_at(&self, time: usize, level: usize, lat: usize, lon: usize) -> f64 {
        let [_, n_level, n_lat, n_lon] = self.shape();
        self.values[((time * n_level + level) * n_lat + lat) * n_lon + lon]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// The grid cell actually chosen by nearest-neighbor selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub latitude: f64,
    pub longitude: f64,
    pub level: f64,
    pub lat_index: usize,
    pub lon_index: usize,
    pub level_index: usize,
}

// ---------------------------------------------------------------------------
// Series types
// ---------------------------------------------------------------------------

/// A single value of the field at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// The time series at one grid cell for one dataset (one year).
///
/// Produced by `extract::extract_point`; one observation per time step of
/// the source dataset, in the dataset's time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSeries {
    pub cell: GridCell,
    pub observations: Vec<Observation>,
}

/// Per-year location series appended in the order they were supplied.
///
/// `cells` records the cell each contributing part came from, in the same
/// order. Nothing about calendar continuity is guaranteed; see
/// `analysis::continuity` for the diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcatenatedSeries {
    pub cells: Vec<GridCell>,
    pub observations: Vec<Observation>,
}

impl ConcatenatedSeries {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The bare value sequence, in series order.
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.observations.iter().map(|o| o.time).collect()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while loading grids or analysing the series.
#[derive(Debug, PartialEq)]
pub enum AnalysisError {
    /// The backing file for a year does not exist.
    NotFound { year: i32, path: String },
    /// A requested coordinate is not available on the dataset's axes.
    OutOfDomain { axis: String, requested: f64 },
    /// The dataset is structurally unusable (shape mismatch, missing variable).
    InvalidDataset(String),
    /// A caller-supplied parameter is outside its valid range.
    InvalidParameter(String),
    /// File content could not be decoded.
    Parse(String),
    /// Any other I/O failure.
    Io(String),
    /// The configuration file is missing or malformed.
    Config(String),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::NotFound { year, path } => {
                write!(f, "Grid file not found for {}: {}", year, path)
            }
            AnalysisError::OutOfDomain { axis, requested } => {
                write!(f, "Out of domain: {} {} not present in dataset", axis, requested)
            }
            AnalysisError::InvalidDataset(msg) => write!(f, "Invalid dataset: {}", msg),
            AnalysisError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            AnalysisError::Parse(msg) => write!(f, "Parse error: {}", msg),
            AnalysisError::Io(msg) => write!(f, "I/O error: {}", msg),
            AnalysisError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for AnalysisError {
    fn from(err: toml::de::Error) -> Self {
        AnalysisError::Config(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

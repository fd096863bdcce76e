/// Run configuration.
///
/// Loaded from an optional TOML file; every table and key may be omitted and
/// falls back to the defaults below (the settings of the reference 1979–2021
/// New York City analyses). `HGT_DATA_DIR`, read from the environment or a
/// `.env` file, overrides `[data].dir`. The CLI applies its own flags on top.
///
/// ```toml
/// [data]
/// dir = "data"
/// format = "netcdf"          # netcdf | json | synthetic
/// pattern = "hgt.{year}.nc"
///
/// [target]
/// location = "nyc"           # or latitude / longitude
/// level = 500.0
///
/// [period]
/// start_year = 1979
/// end_year = 2021
///
/// [peaks]
/// mode = "prominence"        # prominence | height | height_above_mean | distance
/// value = 10.0
///
/// [extremes]
/// lower_percentile = 5.0
/// upper_percentile = 95.0
/// resample = "weekly"
///
/// [smoothing]
/// window = 5
/// min_periods = 1
/// center = false
///
/// [logging]
/// level = "info"
/// ```

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::analysis::aggregate::{DEFAULT_SMOOTHING_WINDOW, RollingMean};
use crate::analysis::extremes::{
    DEFAULT_LOWER_PERCENTILE, DEFAULT_UPPER_PERCENTILE, check_percentile_pair,
};
use crate::analysis::peaks::PeakFilter;
use crate::analysis::resample::ResampleFrequency;
use crate::extract::PointQuery;
use crate::ingest::{DEFAULT_FILE_PATTERN, json::DEFAULT_JSON_PATTERN};
use crate::locations::{DEFAULT_LOCATION, all_location_keys, find_location};
use crate::logging::LogLevel;
use crate::model::{AnalysisError, FIELD_HGT, LEVEL_500_HPA};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "HGT_DATA_DIR";

pub const DEFAULT_START_YEAR: i32 = 1979;
pub const DEFAULT_END_YEAR: i32 = 2021;
pub const DEFAULT_PROMINENCE_M: f64 = 10.0;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    Netcdf,
    Json,
    Synthetic,
}

impl FromStr for DataFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netcdf" | "nc" => Ok(DataFormat::Netcdf),
            "json" => Ok(DataFormat::Json),
            "synthetic" => Ok(DataFormat::Synthetic),
            other => Err(AnalysisError::Config(format!("unknown data format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub format: DataFormat,
    /// File name pattern with a `{year}` placeholder; defaults per format.
    pub pattern: Option<String>,
    pub field: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            format: DataFormat::Netcdf,
            pattern: None,
            field: FIELD_HGT.to_string(),
        }
    }
}

impl DataConfig {
    pub fn file_pattern(&self) -> &str {
        match (&self.pattern, self.format) {
            (Some(p), _) => p,
            (None, DataFormat::Json) => DEFAULT_JSON_PATTERN,
            (None, _) => DEFAULT_FILE_PATTERN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Registry key; ignored when both latitude and longitude are set.
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub level: f64,
    pub wrap_longitude: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            location: None,
            latitude: None,
            longitude: None,
            level: LEVEL_500_HPA,
            wrap_longitude: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    pub start_year: i32,
    pub end_year: i32,
    /// Expected spacing of samples, for the continuity diagnostic.
    pub step_hours: i64,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            step_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremesConfig {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    /// `daily`, `weekly`, `monthly`, or `none` to threshold the raw series.
    pub resample: String,
}

impl Default for ExtremesConfig {
    fn default() -> Self {
        Self {
            lower_percentile: DEFAULT_LOWER_PERCENTILE,
            upper_percentile: DEFAULT_UPPER_PERCENTILE,
            resample: "weekly".to_string(),
        }
    }
}

impl ExtremesConfig {
    pub fn resample_frequency(&self) -> Result<Option<ResampleFrequency>, AnalysisError> {
        match self.resample.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "raw" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub window: usize,
    pub min_periods: usize,
    pub center: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_SMOOTHING_WINDOW,
            min_periods: 1,
            center: false,
        }
    }
}

impl SmoothingConfig {
    pub fn rolling_mean(&self) -> Result<RollingMean, AnalysisError> {
        Ok(RollingMean::new(self.window)?
            .min_periods(self.min_periods)
            .center(self.center))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn log_level(&self) -> Result<LogLevel, AnalysisError> {
        self.level.parse()
    }
}

fn default_peak_filter() -> PeakFilter {
    PeakFilter::Prominence(DEFAULT_PROMINENCE_M)
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub target: TargetConfig,
    pub period: PeriodConfig,
    #[serde(default = "default_peak_filter")]
    pub peaks: PeakFilter,
    pub extremes: ExtremesConfig,
    pub smoothing: SmoothingConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            target: TargetConfig::default(),
            period: PeriodConfig::default(),
            peaks: default_peak_filter(),
            extremes: ExtremesConfig::default(),
            smoothing: SmoothingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AnalysisError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads `path` when given, otherwise starts from the defaults, then
    /// applies the environment (including `.env`).
    pub fn load(path: Option<&Path>) -> Result<Self, AnalysisError> {
        let mut config = match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .map_err(|e| AnalysisError::Config(format!("{}: {}", p.display(), e)))?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        dotenv::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.data.dir = PathBuf::from(dir);
        }
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.period.start_year..=self.period.end_year
    }

    pub fn expected_step(&self) -> Duration {
        Duration::hours(self.period.step_hours)
    }

    /// Resolves the target to coordinates: explicit latitude/longitude win,
    /// then the named location, then the default location.
    pub fn point_query(&self) -> Result<PointQuery, AnalysisError> {
        let t = &self.target;
        let (latitude, longitude) = match (t.latitude, t.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            (None, None) => {
                let key = t.location.as_deref().unwrap_or(DEFAULT_LOCATION);
                let loc = find_location(key).ok_or_else(|| {
                    AnalysisError::Config(format!(
                        "unknown location '{}' (known: {})",
                        key,
                        all_location_keys().join(", ")
                    ))
                })?;
                (loc.latitude, loc.longitude)
            }
            _ => {
                return Err(AnalysisError::Config(
                    "latitude and longitude must be given together".to_string(),
                ));
            }
        };
        Ok(PointQuery {
            latitude,
            longitude,
            level: t.level,
            wrap_longitude: t.wrap_longitude,
        })
    }

    /// Cross-field checks that serde cannot express.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.period.start_year > self.period.end_year {
            return Err(AnalysisError::Config(format!(
                "start_year {} is after end_year {}",
                self.period.start_year, self.period.end_year
            )));
        }
        if self.period.step_hours <= 0 {
            return Err(AnalysisError::Config("step_hours must be positive".to_string()));
        }
        check_percentile_pair(self.extremes.lower_percentile, self.extremes.upper_percentile)?;
        crate::ingest::validate_pattern(self.data.file_pattern())?;
        self.extremes.resample_frequency()?;
        self.smoothing.rolling_mean()?;
        self.logging.log_level()?;
        self.point_query()?;
        Ok(())
    }
}

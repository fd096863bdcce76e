/// Grid loading.
///
/// A `GridSource` hands back one year's `GridDataset` per call. Sources do
/// not cache: each `load` re-reads its backing file and releases it before
/// returning, so at most one year is resident at a time.
///
/// Submodules:
/// - `json` — datasets serialized as JSON (fixtures, small experiments).
/// - `nc` — NCEP-style `hgt.<year>.nc` files (feature `netcdf`).
/// - `time_units` — CF `"<unit> since <epoch>"` time decoding.

pub mod json;
#[cfg(feature = "netcdf")]
pub mod nc;
pub mod time_units;

use std::path::{Path, PathBuf};

use crate::model::{AnalysisError, GridDataset};

/// Placeholder replaced by the four-digit year in file patterns.
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Default per-year file naming used by the NCEP reanalysis archive.
pub const DEFAULT_FILE_PATTERN: &str = "hgt.{year}.nc";

/// Anything that can produce the dataset for a given year.
pub trait GridSource {
    /// Loads the dataset for `year`, failing with `AnalysisError::NotFound`
    /// when the year has no backing data.
    fn load(&self, year: i32) -> Result<GridDataset, AnalysisError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Builds the path of a year's file from a directory and a `{year}` pattern.
pub fn grid_file_path(dir: &Path, pattern: &str, year: i32) -> PathBuf {
    dir.join(pattern.replace(YEAR_PLACEHOLDER, &year.to_string()))
}

/// Checks a pattern names each year's file distinctly.
pub fn validate_pattern(pattern: &str) -> Result<(), AnalysisError> {
    if pattern.contains(YEAR_PLACEHOLDER) {
        Ok(())
    } else {
        Err(AnalysisError::Config(format!(
            "file pattern '{}' must contain {}",
            pattern, YEAR_PLACEHOLDER
        )))
    }
}

/// Maps a file-open failure to `NotFound` when the file is absent.
pub(crate) fn open_error(year: i32, path: &Path, err: std::io::Error) -> AnalysisError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AnalysisError::NotFound {
            year,
            path: path.display().to_string(),
        }
    } else {
        AnalysisError::Io(format!("{}: {}", path.display(), err))
    }
}

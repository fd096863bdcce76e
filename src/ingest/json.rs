/// JSON grid files.
///
/// One file per year, laid out as the axes plus a flat row-major value array.
/// JSON has no NaN, so missing values are written as `null` and read back
/// as NaN. Timestamps are RFC 3339 strings.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GridSource, grid_file_path, open_error, validate_pattern};
use crate::model::{AnalysisError, GridDataset};

/// Default per-year naming for JSON grids.
pub const DEFAULT_JSON_PATTERN: &str = "hgt.{year}.json";

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct GridFile {
    field: String,
    time: Vec<DateTime<Utc>>,
    level: Vec<f64>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    values: Vec<Option<f64>>,
}

pub struct JsonGridSource {
    dir: PathBuf,
    pattern: String,
}

impl JsonGridSource {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Result<Self, AnalysisError> {
        let pattern = pattern.into();
        validate_pattern(&pattern)?;
        Ok(Self {
            dir: dir.into(),
            pattern,
        })
    }

    pub fn path_for(&self, year: i32) -> PathBuf {
        grid_file_path(&self.dir, &self.pattern, year)
    }
}

impl GridSource for JsonGridSource {
    fn load(&self, year: i32) -> Result<GridDataset, AnalysisError> {
        let path = self.path_for(year);
        let text = fs::read_to_string(&path).map_err(|e| open_error(year, &path, e))?;
        let file: GridFile = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::Parse(format!("{}: {}", path.display(), e)))?;
        file.into_dataset()
    }

    fn describe(&self) -> String {
        format!("JSON grids {}", self.dir.join(&self.pattern).display())
    }
}

impl GridFile {
    fn into_dataset(self) -> Result<GridDataset, AnalysisError> {
        let values = self
            .values
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        GridDataset::new(self.field, self.time, self.level, self.lat, self.lon, values)
    }
}

/// Decodes a dataset from JSON text.
pub fn read_json_grid(text: &str) -> Result<GridDataset, AnalysisError> {
    let file: GridFile = serde_json::from_str(text)?;
    file.into_dataset()
}

/// Writes a dataset in the layout `JsonGridSource` reads.
pub fn write_json_grid(path: &Path, dataset: &GridDataset) -> Result<(), AnalysisError> {
    let file = GridFile {
        field: dataset.field.clone(),
        time: dataset.times.clone(),
        level: dataset.levels.clone(),
        lat: dataset.latitudes.clone(),
        lon: dataset.longitudes.clone(),
        values: dataset
            .values()
            .iter()
            .map(|&v| if v.is_finite() { Some(v) } else { None })
            .collect(),
    };
    let json = serde_json::to_string(&file)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FIELD_HGT;
    use chrono::TimeZone;

    fn sample() -> GridDataset {
        GridDataset::new(
            FIELD_HGT,
            vec![
                Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(1990, 1, 2, 0, 0, 0).unwrap(),
            ],
            vec![500.0],
            vec![40.0],
            vec![285.0, 287.5],
            vec![5500.0, f64::NAN, 5510.0, 5520.0],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_year_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonGridSource::new(dir.path(), DEFAULT_JSON_PATTERN).unwrap();
        let err = source.load(1850).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { year: 1850, .. }), "got {:?}", err);
    }

    #[test]
    fn test_written_grid_loads_back_with_nan_for_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonGridSource::new(dir.path(), DEFAULT_JSON_PATTERN).unwrap();
        write_json_grid(&source.path_for(1990), &sample()).unwrap();

        let loaded = source.load(1990).unwrap();
        assert_eq!(loaded.shape(), [2, 1, 1, 2]);
        assert_eq!(loaded.value_at(1, 0, 0, 1), 5520.0);
        assert!(loaded.value_at(0, 0, 0, 1).is_nan());
    }

    #[test]
    fn test_inconsistent_shape_is_rejected() {
        let text = r#"{"field":"hgt","time":["1990-01-01T00:00:00Z"],
            "level":[500.0],"lat":[40.0],"lon":[285.0,287.5],"values":[1.0]}"#;
        assert!(matches!(
            read_json_grid(text),
            Err(AnalysisError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonGridSource::new(dir.path(), DEFAULT_JSON_PATTERN).unwrap();
        fs::write(source.path_for(2001), "not json").unwrap();
        assert!(matches!(source.load(2001), Err(AnalysisError::Parse(_))));
    }
}

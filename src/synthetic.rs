/// Synthetic grid source for demos and tests.
///
/// Generates a deterministic regional 500 hPa-like field when no reanalysis
/// files are at hand: a seasonal cycle, a meridional gradient, travelling
/// synoptic waves and a small pseudo-random perturbation, all reproducible
/// from the year alone. Selected years can be marked missing to exercise
/// the loader's `NotFound` path.

use std::collections::BTreeSet;
use std::f64::consts::TAU;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::ingest::GridSource;
use crate::model::{AnalysisError, FIELD_HGT, GridDataset};

/// Pressure levels carried by the synthetic grid, surface first.
pub const SYNTHETIC_LEVELS: [f64; 5] = [1000.0, 850.0, 700.0, 500.0, 300.0];

pub struct SyntheticGridSource {
    /// Samples per day (1 = daily means, 4 = 6-hourly); never 0.
    steps_per_day: u32,
    pub latitudes: Vec<f64>,
    /// 0–360 convention, like the NCEP archive.
    pub longitudes: Vec<f64>,
    missing_years: BTreeSet<i32>,
}

impl Default for SyntheticGridSource {
    fn default() -> Self {
        Self {
            steps_per_day: 1,
            // 30N..50N and 250E..300E at 2.5 degrees.
            latitudes: (0..9).map(|i| 30.0 + 2.5 * i as f64).collect(),
            longitudes: (0..21).map(|i| 250.0 + 2.5 * i as f64).collect(),
            missing_years: BTreeSet::new(),
        }
    }
}

impl SyntheticGridSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps_per_day(mut self, steps: u32) -> Self {
        self.steps_per_day = steps.max(1);
        self
    }

    /// Makes `load(year)` fail with `NotFound`.
    pub fn with_missing_year(mut self, year: i32) -> Self {
        self.missing_years.insert(year);
        self
    }

    /// Height in metres at one point; pure function of its arguments.
    pub fn height(&self, year: i32, day_of_year: f64, level: f64, lat: f64, lon: f64) -> f64 {
        let base = level_base_height(level);
        // Scale anomalies with height of the surface above ground.
        let weight = (base / 5600.0).clamp(0.05, 1.6);

        let season = 140.0 * (TAU * (day_of_year - 200.0) / 365.25).cos();
        let gradient = -18.0 * (lat - 40.0);
        let synoptic = 70.0 * (TAU * (day_of_year / 6.5 - lon / 60.0)).sin()
            + 35.0 * (TAU * (day_of_year / 17.0 + lat / 45.0)).sin();
        let trend = 0.4 * (year - 1979) as f64;
        let noise = 15.0 * (unit_noise(year, day_of_year, lat, lon) - 0.5);

        base + weight * (season + gradient + synoptic + noise) + trend
    }
}

impl GridSource for SyntheticGridSource {
    fn load(&self, year: i32) -> Result<GridDataset, AnalysisError> {
        if self.missing_years.contains(&year) {
            return Err(AnalysisError::NotFound {
                year,
                path: format!("synthetic:{}", year),
            });
        }
        let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| {
            AnalysisError::InvalidParameter(format!("year {} outside supported range", year))
        })?;
        let days = if first.leap_year() { 366 } else { 365 };
        let step = Duration::minutes(24 * 60 / self.steps_per_day as i64);
        let start = Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN));

        let n_steps = days * self.steps_per_day as i64;
        let times: Vec<_> = (0..n_steps).map(|i| start + step * i as i32).collect();

        let mut values = Vec::with_capacity(
            times.len() * SYNTHETIC_LEVELS.len() * self.latitudes.len() * self.longitudes.len(),
        );
        for i in 0..times.len() {
            let doy = i as f64 / self.steps_per_day as f64;
            for &level in &SYNTHETIC_LEVELS {
                for &lat in &self.latitudes {
                    for &lon in &self.longitudes {
                        values.push(self.height(year, doy, level, lat, lon));
                    }
                }
            }
        }

        GridDataset::new(
            FIELD_HGT,
            times,
            SYNTHETIC_LEVELS.to_vec(),
            self.latitudes.clone(),
            self.longitudes.clone(),
            values,
        )
    }

    fn describe(&self) -> String {
        format!(
            "synthetic grid {}x{} ({} step/day)",
            self.latitudes.len(),
            self.longitudes.len(),
            self.steps_per_day
        )
    }
}

/// Standard-atmosphere-ish geopotential height of a pressure surface.
fn level_base_height(level: f64) -> f64 {
    // Scale height of ~7.6 km, anchored at 500 hPa = 5600 m.
    5600.0 + 7600.0 * (500.0 / level).ln()
}

/// Deterministic value in [0, 1) from the point coordinates (splitmix64).
fn unit_noise(year: i32, day: f64, lat: f64, lon: f64) -> f64 {
    let mut z = (year as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((day * 4.0).round() as u64)
        .wrapping_add(((lat * 10.0).round() as i64 as u64) << 20)
        .wrapping_add(((lon * 10.0).round() as i64 as u64) << 40);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_daily_grid_covers_whole_year() {
        let ds = SyntheticGridSource::new().load(1980).unwrap();
        assert_eq!(ds.time_steps(), 366);
        assert_eq!(ds.shape(), [366, 5, 9, 21]);
        assert_eq!(ds.times[0].year(), 1980);
        assert_eq!(ds.times[365].year(), 1980);
    }

    #[test]
    fn test_six_hourly_grid_has_four_steps_per_day() {
        let ds = SyntheticGridSource::new().with_steps_per_day(4).load(1981).unwrap();
        assert_eq!(ds.time_steps(), 365 * 4);
        assert_eq!(ds.times[1] - ds.times[0], Duration::hours(6));
    }

    #[test]
    fn test_zero_steps_per_day_falls_back_to_daily() {
        let ds = SyntheticGridSource::new().with_steps_per_day(0).load(1981).unwrap();
        assert_eq!(ds.time_steps(), 365);
    }

    #[test]
    fn test_load_is_deterministic() {
        let source = SyntheticGridSource::new();
        assert_eq!(source.load(1990).unwrap(), source.load(1990).unwrap());
    }

    #[test]
    fn test_500_hpa_values_are_plausible() {
        let ds = SyntheticGridSource::new().load(2000).unwrap();
        let level = ds.levels.iter().position(|&l| l == 500.0).unwrap();
        for t in (0..ds.time_steps()).step_by(30) {
            let v = ds.value_at(t, level, 4, 10);
            assert!((5200.0..6000.0).contains(&v), "implausible height {}", v);
        }
    }

    #[test]
    fn test_missing_year_is_not_found() {
        let source = SyntheticGridSource::new().with_missing_year(1999);
        assert!(matches!(
            source.load(1999),
            Err(AnalysisError::NotFound { year: 1999, .. })
        ));
        assert!(source.load(2000).is_ok());
    }
}

/// Command line interface.
///
/// `hgt_analysis [global options] <series | peaks | extremes>`
///
/// Flags override the configuration file, which overrides the built-in
/// defaults. Without `--config` the defaults reproduce the 1979–2021 New
/// York City analyses.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::analysis::peaks::PeakFilter;
use crate::config::{AppConfig, DataFormat};
use crate::logging::{self, Stage};
use crate::model::AnalysisError;
use crate::pipeline::{diagnose_continuity, load_series, open_source};
use crate::report::{self, AnalysisReport};

#[derive(Parser, Debug)]
#[command(author, version, about = "500 hPa geopotential height analysis", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the per-year grid files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Grid file format: netcdf, json or synthetic
    #[arg(long, global = true)]
    pub format: Option<DataFormat>,

    /// Named location from the registry (e.g. nyc)
    #[arg(long, global = true, conflicts_with_all = ["lat", "lon"])]
    pub location: Option<String>,

    /// Target latitude, degrees north
    #[arg(long, global = true, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Target longitude, degrees east
    #[arg(long, global = true, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Pressure level in hPa
    #[arg(long, global = true)]
    pub level: Option<f64>,

    #[arg(long, global = true)]
    pub start_year: Option<i32>,

    #[arg(long, global = true)]
    pub end_year: Option<i32>,

    /// Use generated grids instead of files
    #[arg(long, global = true)]
    pub synthetic: bool,

    /// Write the full report as JSON to this path
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    /// Append log lines to this file
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summary statistics of the extracted series
    Series {
        /// Also print per-year statistics
        #[arg(long)]
        yearly: bool,
    },
    /// Ridge and trough counts by season and year
    Peaks(PeaksArgs),
    /// Percentile extremes
    Extremes(ExtremesArgs),
}

/// At most one filter; the configured filter applies when none is given.
#[derive(Args, Debug, Default)]
#[group(required = false, multiple = false)]
pub struct FilterArgs {
    /// Minimum prominence in metres
    #[arg(long)]
    pub prominence: Option<f64>,
    /// Minimum height in metres
    #[arg(long, allow_negative_numbers = true)]
    pub height: Option<f64>,
    /// Minimum height equal to the series mean
    #[arg(long)]
    pub height_mean: bool,
    /// Minimum separation in samples
    #[arg(long)]
    pub distance: Option<usize>,
}

impl FilterArgs {
    pub fn filter(&self) -> Option<PeakFilter> {
        if let Some(p) = self.prominence {
            Some(PeakFilter::Prominence(p))
        } else if let Some(h) = self.height {
            Some(PeakFilter::Height(h))
        } else if self.height_mean {
            Some(PeakFilter::HeightAboveMean)
        } else {
            self.distance.map(PeakFilter::Distance)
        }
    }
}

#[derive(Args, Debug)]
pub struct PeaksArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Moving-average window in years
    #[arg(long)]
    pub window: Option<usize>,
    /// Minimum filled cells per window
    #[arg(long)]
    pub min_periods: Option<usize>,
    /// Center the moving-average window
    #[arg(long)]
    pub center: bool,
}

#[derive(Args, Debug)]
pub struct ExtremesArgs {
    /// Lower percentile (0-100)
    #[arg(long)]
    pub lower: Option<f64>,
    /// Upper percentile (0-100)
    #[arg(long)]
    pub upper: Option<f64>,
    /// Resample first: daily, weekly, monthly or none
    #[arg(long)]
    pub resample: Option<String>,
}

impl Cli {
    /// Applies the command line on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.data_dir {
            config.data.dir = dir.clone();
        }
        if let Some(format) = self.format {
            config.data.format = format;
        }
        if self.synthetic {
            config.data.format = DataFormat::Synthetic;
        }
        if let Some(key) = &self.location {
            config.target.location = Some(key.clone());
            config.target.latitude = None;
            config.target.longitude = None;
        }
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            config.target.latitude = Some(lat);
            config.target.longitude = Some(lon);
        }
        if let Some(level) = self.level {
            config.target.level = level;
        }
        if let Some(y) = self.start_year {
            config.period.start_year = y;
        }
        if let Some(y) = self.end_year {
            config.period.end_year = y;
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }

        match &self.command {
            Command::Series { .. } => {}
            Command::Peaks(args) => {
                if let Some(filter) = args.filter.filter() {
                    config.peaks = filter;
                }
                if let Some(w) = args.window {
                    config.smoothing.window = w;
                }
                if let Some(m) = args.min_periods {
                    config.smoothing.min_periods = m;
                }
                if args.center {
                    config.smoothing.center = true;
                }
            }
            Command::Extremes(args) => {
                if let Some(lo) = args.lower {
                    config.extremes.lower_percentile = lo;
                }
                if let Some(hi) = args.upper {
                    config.extremes.upper_percentile = hi;
                }
                if let Some(r) = &args.resample {
                    config.extremes.resample = r.clone();
                }
            }
        }
    }
}

/// Loads configuration, runs the selected analysis and prints it.
pub fn run(cli: &Cli) -> Result<AnalysisReport, AnalysisError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    logging::init_logger(
        config.logging.log_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let query = config.point_query()?;
    let source = open_source(&config.data)?;
    let series = load_series(source.as_ref(), config.years(), &query)?;
    let continuity = diagnose_continuity(&series, config.expected_step());

    let mut analysis = AnalysisReport::new(
        &query,
        (config.period.start_year, config.period.end_year),
        &series,
        report::analyze_series(&series, continuity),
    );
    report::print_series_summary(&analysis);

    match &cli.command {
        Command::Series { yearly } => {
            if *yearly {
                report::print_yearly_stats(&analysis.series);
            }
        }
        Command::Peaks(_) => {
            let rolling = config.smoothing.rolling_mean()?;
            let peaks = report::analyze_peaks(&series, config.peaks, &rolling)?;
            report::print_peak_summary(&peaks);
            analysis.peaks = Some(peaks);
        }
        Command::Extremes(_) => {
            let extremes = report::analyze_extremes(
                &series,
                config.extremes.lower_percentile,
                config.extremes.upper_percentile,
                config.extremes.resample_frequency()?,
            )?;
            report::print_extreme_summary(&extremes);
            analysis.extremes = Some(extremes);
        }
    }

    if let Some(path) = &cli.report {
        analysis.write_json(path)?;
    }
    logging::debug(Stage::System, None, "run complete");
    Ok(analysis)
}

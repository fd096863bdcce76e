/// Structured logging for the height analysis pipeline
///
/// Provides leveled logging tagged with the pipeline stage and, where it
/// applies, the year being processed. Supports console output and an
/// optional append-only log file for long multi-decade runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::AnalysisError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(AnalysisError::Config(format!("unknown log level '{}'", other))),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Loader,
    Extractor,
    Concat,
    Features,
    Report,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Loader => write!(f, "LOAD"),
            Stage::Extractor => write!(f, "EXTRACT"),
            Stage::Concat => write!(f, "CONCAT"),
            Stage::Features => write!(f, "FEAT"),
            Stage::Report => write!(f, "REPORT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// The input simply isn't there: a year outside the downloaded range
    Missing,
    /// The request doesn't fit the data: wrong level or bad parameter
    Domain,
    /// The data itself is broken or unreadable
    Corrupt,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Missing => write!(f, "MISSING"),
            FailureType::Domain => write!(f, "DOMAIN"),
            FailureType::Corrupt => write!(f, "CORRUPT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, stage: &Stage, year: Option<i32>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let year_part = year.map(|y| format!(" [{}]", y)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, stage, year_part, message);

        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", stage, year_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", stage, year_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}{}: {}", stage, year_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, stage: Stage, year: Option<i32>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &stage, year, message);
        }
    }
}

/// Log a general informational message
pub fn info(stage: Stage, year: Option<i32>, message: &str) {
    emit(LogLevel::Info, stage, year, message);
}

/// Log a warning message
pub fn warn(stage: Stage, year: Option<i32>, message: &str) {
    emit(LogLevel::Warning, stage, year, message);
}

/// Log an error message
pub fn error(stage: Stage, year: Option<i32>, message: &str) {
    emit(LogLevel::Error, stage, year, message);
}

/// Log a debug message
pub fn debug(stage: Stage, year: Option<i32>, message: &str) {
    emit(LogLevel::Debug, stage, year, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a pipeline failure by what went wrong
pub fn classify_failure(err: &AnalysisError) -> FailureType {
    match err {
        AnalysisError::NotFound { .. } => FailureType::Missing,
        AnalysisError::OutOfDomain { .. }
        | AnalysisError::InvalidParameter(_)
        | AnalysisError::Config(_) => FailureType::Domain,
        AnalysisError::InvalidDataset(_) | AnalysisError::Parse(_) | AnalysisError::Io(_) => {
            FailureType::Corrupt
        }
    }
}

/// Log a per-year failure with its classification
///
/// Every failure aborts the run, so all classes log at error level; the
/// class tag tells the operator whether to fetch, fix or re-download.
pub fn log_year_failure(stage: Stage, year: i32, operation: &str, err: &AnalysisError) {
    let failure_type = classify_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);
    error(stage, Some(year), &message);
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a multi-year load
pub fn log_load_summary(total: usize, loaded: usize, observations: usize) {
    let message = load_summary_message(total, loaded, observations);

    if loaded == total {
        info(Stage::Loader, None, &message);
    } else if loaded == 0 {
        error(Stage::Loader, None, &message);
    } else {
        warn(Stage::Loader, None, &message);
    }
}

fn load_summary_message(total: usize, loaded: usize, observations: usize) -> String {
    format!(
        "Load complete: {}/{} years, {} observations",
        loaded, total, observations
    )
}

/// Log a multi-year load that stopped at `failed_year`
pub fn log_load_aborted(total: usize, loaded: usize, failed_year: i32) {
    error(
        Stage::Loader,
        None,
        &load_aborted_message(total, loaded, failed_year),
    );
}

fn load_aborted_message(total: usize, loaded: usize, failed_year: i32) -> String {
    format!(
        "Load aborted at {}: {}/{} years loaded before the failure",
        failed_year, loaded, total
    )
}

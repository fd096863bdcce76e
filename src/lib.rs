/// 500 hPa geopotential height analysis.
///
/// Loads yearly reanalysis grids, extracts the series at one grid cell,
/// and derives ridge/trough counts, seasonal tables, percentile extremes
/// and linear trends from it.
///
/// Data flow: `ingest` (one year at a time) → `extract` → `analysis::concat`
/// → `analysis::*` feature extraction → `report`.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod extract;
pub mod ingest;
pub mod locations;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod synthetic;

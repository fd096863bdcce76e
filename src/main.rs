use std::process::ExitCode;

use clap::Parser;

use hgt_analysis::cli::{self, Cli};
use hgt_analysis::logging::{self, LogLevel, Stage};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Replaced once the configuration is loaded; covers config errors.
    logging::init_logger(LogLevel::Info, None, false);

    match cli::run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(Stage::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

//! `dqcheck` binary entry point.
//!
//! Exit codes: 0 when the run completes (clean run, or report delivered),
//! 1 when issues were found but the report could not be delivered, 2 for
//! configuration or registry errors before any check executes.

use std::path::Path;
use std::process;

use clap::Parser;

use dqcheck::cli::Cli;
use dqcheck::config::AppConfig;
use dqcheck::manager::{CheckManager, ReportOutcome};
use dqcheck::reporter::EmailReporter;

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match AppConfig::load(Path::new(".")) {
        Ok(config) => config,
        Err(error) => {
            log::error!("Configuration error: {error}");
            process::exit(2);
        }
    };

    let mut manager = CheckManager::new(&config);
    if let Err(error) = manager.run_checks(cli.checks.as_deref(), cli.exclude.as_deref()) {
        log::error!("{error}");
        process::exit(2);
    }

    let reporter = EmailReporter::new(&config);
    match manager.send_report(&reporter) {
        ReportOutcome::NothingToSend | ReportOutcome::Delivered => {}
        ReportOutcome::DeliveryFailed => process::exit(1),
    }
}

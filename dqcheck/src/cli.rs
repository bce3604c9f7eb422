//! Command-line interface definition.

use clap::Parser;

const AFTER_HELP: &str = "\
Examples:
  dqcheck
      Run every registered check and email a report when issues are found.

  dqcheck --checks CityValidationMag customer_name_mismatch_mag
      Run only the named checks. Names match logical check names or source
      identifiers, case-insensitively.

  dqcheck --exclude MissingProductImagesMag
      Run everything except the named checks.
";

/// Run data quality checks against the configured databases and email a
/// report when issues are found.
#[derive(Debug, Parser)]
#[command(
    name = "dqcheck",
    version,
    about = "Run data quality checks and send email alerts",
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Run only these checks (logical name or source identifier).
    #[arg(
        long,
        value_name = "CHECK",
        num_args = 1..,
        conflicts_with = "exclude"
    )]
    pub checks: Option<Vec<String>>,

    /// Run all checks except these (logical name or source identifier).
    #[arg(long, value_name = "CHECK", num_args = 1..)]
    pub exclude: Option<Vec<String>>,
}

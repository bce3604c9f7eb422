//! Check trait definition and the static check registry.
//!
//! Every check implements the [`Check`] trait: one query-and-classify pass
//! over a configured database, producing an [`IssueCollection`]. Checks are
//! stateless; configuration is passed by reference into [`Check::run`].
//!
//! The registry function [`build_check_registry`] statically enumerates all
//! available checks; adding a check means adding one constructor line there.

pub mod city_validation_mag;
pub mod customer_name_mismatch_mag;
pub mod missing_product_images_mag;

use crate::config::AppConfig;
use crate::db::DbError;
use crate::types::{Issue, IssueCollection, IssueError, Severity};

/// Failure inside a check body. `run` converts this into a single
/// high-severity issue so one failing check cannot abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Connection or query failure.
    #[error(transparent)]
    Db(#[from] DbError),
    /// Issue construction failure (empty name or message).
    #[error(transparent)]
    Issue(#[from] IssueError),
}

/// Every check implements this trait.
///
/// Checks are stateless and run exactly once per pipeline run. `collect`
/// holds the fallible query-and-classify logic; the provided `run` wraps it
/// with the failure contract.
pub trait Check {
    /// Logical name, matching the implementing type's name (used for
    /// selection flags and report grouping).
    fn name(&self) -> &'static str;

    /// Stable source identifier: the module file that defines the check.
    /// Selection flags match against this as a fallback.
    fn source_id(&self) -> &'static str;

    /// Message used for the issue produced when `collect` fails.
    fn failure_message(&self) -> &'static str {
        "Error executing check"
    }

    /// Execute queries and classify rows into issues.
    ///
    /// # Errors
    ///
    /// Any [`CheckError`]; callers go through [`Check::run`], which converts
    /// the error into a reported issue.
    fn collect(&self, config: &AppConfig) -> Result<IssueCollection, CheckError>;

    /// Run the check. Never fails past this boundary: an error from
    /// `collect` becomes exactly one high-severity issue attributed to this
    /// check, carrying the error text in its details.
    fn run(&self, config: &AppConfig) -> IssueCollection {
        match self.collect(config) {
            Ok(issues) => issues,
            Err(error) => failure_collection(self.name(), self.failure_message(), &error),
        }
    }
}

impl std::fmt::Debug for dyn Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name()).finish()
    }
}

/// One high-severity issue describing a check that could not run.
fn failure_collection(check_name: &str, message: &str, error: &CheckError) -> IssueCollection {
    let mut issues = IssueCollection::new();
    match Issue::new(check_name, Severity::High, message) {
        Ok(issue) => issues.push(issue.with_details(error.to_string())),
        // Registry names and failure messages are non-empty literals, so
        // this arm is only reachable from a broken Check impl.
        Err(e) => log::error!("Could not record failure for check '{check_name}': {e}"),
    }
    issues
}

/// Build the registry of all available checks.
///
/// Returns boxed trait objects in a stable order; the manager applies
/// selection filters on top of this list.
#[must_use]
pub fn build_check_registry() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(city_validation_mag::CityValidationMag),
        Box::new(customer_name_mismatch_mag::CustomerNameMismatchMag),
        Box::new(missing_product_images_mag::MissingProductImagesMag),
    ]
}

//! Check orchestration: discovery, selection filtering, sequential
//! execution, and report dispatch.
//!
//! The pipeline per run is one-directional: discover the registry, apply
//! the include/exclude flags and the configured disabled set, execute each
//! selected check, then hand the aggregate to the reporter.
//!
//! Every check dispatch is wrapped in `catch_unwind` so that a panic in one
//! check produces a high-severity issue instead of aborting the batch.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::checks::{build_check_registry, Check};
use crate::config::AppConfig;
use crate::reporter::{humanize_check_name, EmailReporter};
use crate::types::{Issue, IssueCollection, Severity};

/// Configuration failures that abort the run before any check executes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ManagerError {
    /// Two registered checks share a logical name or source identifier.
    #[error("Duplicate check name in registry: '{0}'")]
    DuplicateName(String),

    /// Both selection flags were supplied.
    #[error("Cannot use both --checks and --exclude at the same time")]
    ConflictingSelections,
}

/// What `send_report` did with the aggregate collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// No issues were found; no delivery was attempted.
    NothingToSend,
    /// The report was delivered.
    Delivered,
    /// Delivery was attempted and failed.
    DeliveryFailed,
}

/// Discovers, filters, and executes checks, owning the aggregate
/// [`IssueCollection`] for the run.
pub struct CheckManager<'a> {
    config: &'a AppConfig,
    issues: IssueCollection,
    execution_info: Option<String>,
}

impl<'a> CheckManager<'a> {
    #[must_use]
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            issues: IssueCollection::new(),
            execution_info: None,
        }
    }

    /// Discover, filter, and run checks, aggregating their issues.
    ///
    /// At most one of `include` and `exclude` may be given. The disabled
    /// list from configuration is subtracted in every mode.
    ///
    /// # Errors
    ///
    /// Returns a [`ManagerError`] for duplicate registry names or when both
    /// selection flags are supplied; nothing executes in either case.
    pub fn run_checks(
        &mut self,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
    ) -> Result<(), ManagerError> {
        let all_checks = discover_checks()?;
        if all_checks.is_empty() {
            log::warn!("No checks found to run");
            return Ok(());
        }

        let (selected, info) =
            filter_checks(all_checks, &self.config.checks.disabled, include, exclude)?;
        self.execution_info = Some(info);

        if selected.is_empty() {
            log::warn!("No checks to run after filtering");
            return Ok(());
        }

        log::info!("Running {} check(s)...", selected.len());
        for check in &selected {
            self.run_one(check.as_ref());
        }
        log::info!("Total issues found: {}", self.issues.len());
        Ok(())
    }

    /// Run a single check, converting a panic into one high-severity issue.
    fn run_one(&mut self, check: &dyn Check) {
        log::info!("Running {}...", check.name());
        let config = self.config;
        let result = catch_unwind(AssertUnwindSafe(|| check.run(config)));

        match result {
            Ok(check_issues) => {
                if check_issues.is_empty() {
                    log::info!("  No issues found");
                } else {
                    log::info!("  Found {} issue(s)", check_issues.len());
                }
                self.issues.merge(check_issues);
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_owned()
                } else {
                    "unknown panic".to_owned()
                };
                log::error!("  Error running {}: {}", check.name(), panic_msg);
                match Issue::new(check.name(), Severity::High, "Error executing check") {
                    Ok(issue) => self.issues.push(issue.with_details(panic_msg)),
                    Err(e) => log::error!(
                        "Could not record failure for check '{}': {}",
                        check.name(),
                        e
                    ),
                }
            }
        }
    }

    /// Deliver the aggregate report. An empty collection sends nothing.
    pub fn send_report(&self, reporter: &EmailReporter) -> ReportOutcome {
        if self.issues.is_empty() {
            log::info!("No issues found. No email will be sent.");
            return ReportOutcome::NothingToSend;
        }

        log::info!("Sending email report...");
        if reporter.send(&self.issues, self.execution_info.as_deref()) {
            log::info!("Email sent successfully");
            ReportOutcome::Delivered
        } else {
            log::error!("Failed to send email");
            ReportOutcome::DeliveryFailed
        }
    }

    /// Aggregate issues collected so far.
    #[must_use]
    pub fn issues(&self) -> &IssueCollection {
        &self.issues
    }

    /// Human-readable description of which checks ran, set by `run_checks`.
    #[must_use]
    pub fn execution_info(&self) -> Option<&str> {
        self.execution_info.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Discovery and selection
// ---------------------------------------------------------------------------

/// Load the static registry, rejecting duplicate names.
fn discover_checks() -> Result<Vec<Box<dyn Check>>, ManagerError> {
    let checks = build_check_registry();
    ensure_distinct(&checks)?;
    for check in &checks {
        log::debug!("Loaded check: {}", check.name());
    }
    Ok(checks)
}

/// Reject registries where two checks share a logical name or a source
/// identifier (case-insensitive), which would make name resolution
/// ambiguous.
fn ensure_distinct(checks: &[Box<dyn Check>]) -> Result<(), ManagerError> {
    let mut names: Vec<String> = Vec::new();
    let mut ids: Vec<String> = Vec::new();
    for check in checks {
        let name = check.name().to_lowercase();
        if names.contains(&name) {
            return Err(ManagerError::DuplicateName(check.name().to_owned()));
        }
        names.push(name);

        let id = check.source_id().to_lowercase();
        if ids.contains(&id) {
            return Err(ManagerError::DuplicateName(check.source_id().to_owned()));
        }
        ids.push(id);
    }
    Ok(())
}

/// Resolve a user-supplied name to a check's logical name, matching
/// case-insensitively against logical names first, then source identifiers.
fn resolve_name(name: &str, checks: &[Box<dyn Check>]) -> Option<&'static str> {
    let lower = name.to_lowercase();
    if let Some(check) = checks.iter().find(|c| c.name().to_lowercase() == lower) {
        return Some(check.name());
    }
    checks
        .iter()
        .find(|c| c.source_id().to_lowercase() == lower)
        .map(|c| c.name())
}

/// Apply include/exclude selection plus the configured disabled set.
///
/// Returns the selected checks in registry order and a human-readable
/// description of the selection for the report.
fn filter_checks(
    all_checks: Vec<Box<dyn Check>>,
    disabled: &[String],
    include: Option<&[String]>,
    exclude: Option<&[String]>,
) -> Result<(Vec<Box<dyn Check>>, String), ManagerError> {
    if include.is_some() && exclude.is_some() {
        return Err(ManagerError::ConflictingSelections);
    }

    // The disabled list applies in every mode.
    let mut disabled_names: Vec<&'static str> = Vec::new();
    let mut unknown_disabled: Vec<&str> = Vec::new();
    for name in disabled {
        match resolve_name(name, &all_checks) {
            Some(resolved) => {
                if !disabled_names.contains(&resolved) {
                    disabled_names.push(resolved);
                }
            }
            None => unknown_disabled.push(name),
        }
    }
    if !unknown_disabled.is_empty() {
        log::warn!(
            "Could not find disabled checks: {}",
            unknown_disabled.join(", ")
        );
    }

    if let Some(include) = include {
        let mut resolved_names: Vec<&'static str> = Vec::new();
        let mut not_found: Vec<&str> = Vec::new();
        for name in include {
            match resolve_name(name, &all_checks) {
                Some(resolved) => {
                    if !resolved_names.contains(&resolved) {
                        resolved_names.push(resolved);
                    }
                }
                None => not_found.push(name),
            }
        }
        if !not_found.is_empty() {
            log::warn!("Could not find checks: {}", not_found.join(", "));
        }

        let any_resolved = !resolved_names.is_empty();
        let (runnable, blocked): (Vec<&'static str>, Vec<&'static str>) = resolved_names
            .into_iter()
            .partition(|name| !disabled_names.contains(name));
        if !blocked.is_empty() {
            log::warn!(
                "Requested checks are disabled by configuration: {}",
                blocked.join(", ")
            );
        }

        if runnable.is_empty() {
            let info = if any_resolved {
                format!(
                    "All requested checks are disabled: {}",
                    format_names(&blocked)
                )
            } else {
                format!("No valid checks found from: {}", include.join(", "))
            };
            return Ok((Vec::new(), info));
        }

        let selected: Vec<Box<dyn Check>> = all_checks
            .into_iter()
            .filter(|c| runnable.contains(&c.name()))
            .collect();
        let mut info = format!("Selected checks executed: {}", format_names(&runnable));
        if !blocked.is_empty() {
            info.push_str(&format!(
                " (requested but disabled: {})",
                format_names(&blocked)
            ));
        }
        return Ok((selected, info));
    }

    if let Some(exclude) = exclude {
        let mut blocked: Vec<&'static str> = Vec::new();
        let mut not_found: Vec<&str> = Vec::new();
        for name in exclude {
            match resolve_name(name, &all_checks) {
                Some(resolved) => {
                    if !blocked.contains(&resolved) {
                        blocked.push(resolved);
                    }
                }
                None => not_found.push(name),
            }
        }
        if !not_found.is_empty() {
            log::warn!("Could not find checks to exclude: {}", not_found.join(", "));
        }
        for &name in &disabled_names {
            if !blocked.contains(&name) {
                blocked.push(name);
            }
        }

        let selected: Vec<Box<dyn Check>> = all_checks
            .into_iter()
            .filter(|c| !blocked.contains(&c.name()))
            .collect();
        let info = if blocked.is_empty() {
            "All checks executed".to_owned()
        } else {
            format!("All checks executed except: {}", format_names(&blocked))
        };
        return Ok((selected, info));
    }

    let selected: Vec<Box<dyn Check>> = all_checks
        .into_iter()
        .filter(|c| !disabled_names.contains(&c.name()))
        .collect();
    let info = if disabled_names.is_empty() {
        "All checks executed".to_owned()
    } else {
        format!(
            "All checks executed except: {}",
            format_names(&disabled_names)
        )
    };
    Ok((selected, info))
}

/// Join humanized check names for display.
fn format_names(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| humanize_check_name(name))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

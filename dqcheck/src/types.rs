//! Core type definitions for the data-quality pipeline.
//!
//! - [`Severity`] ranks an issue's urgency (`low`/`medium`/`high`)
//! - [`Issue`] is the atomic unit of check output, validated at construction
//! - [`Record`] and [`ExtraData`] carry structured payloads for rendering
//! - [`IssueCollection`] is the ordered aggregate with merge, grouping, and
//!   severity counts

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Urgency of a discovered data-quality issue.
///
/// The wire/display form is the lowercase name. Parsing accepts exactly the
/// three lowercase names; anything else (including `"High"`) is rejected so
/// that sloppy producers fail loudly instead of minting a fourth level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or low-impact finding, no urgency.
    Low,
    /// Should be cleaned up; does not block operations.
    Medium,
    /// Data is wrong or a check could not run at all.
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Severity {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(IssueError::InvalidSeverity(other.to_owned())),
        }
    }
}

/// Construction-time validation failures for [`Issue`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IssueError {
    /// The producing check's name was empty.
    #[error("issue check_name must not be empty")]
    EmptyCheckName,
    /// The issue message was empty.
    #[error("issue message must not be empty")]
    EmptyMessage,
    /// A severity string outside `low`/`medium`/`high`.
    #[error("invalid severity '{0}': must be one of low, medium, high")]
    InvalidSeverity(String),
}

/// One row of tabular extra data: ordered (column, value) pairs.
///
/// Column order is the insertion order; the report renderer takes its table
/// header from the first record of a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, builder-style.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((column.into(), value.into()));
        self
    }

    /// Look up a value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Structured payload attached to an [`Issue`] for report rendering.
///
/// | Field | Rendered as |
/// |---|---|
/// | `entity_ids` | bullet list titled "Entity IDs", truncated |
/// | `invalid_values` | bullet list titled "Invalid Values", truncated |
/// | `records` | table titled "Detailed Records", truncated |
/// | `summary` | key/value list titled "Summary", always in full |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraData {
    /// Scalar entity identifiers.
    pub entity_ids: Vec<String>,
    /// Offending values, typically deduplicated and sorted by the producer.
    pub invalid_values: Vec<String>,
    /// Tabular detail rows.
    pub records: Vec<Record>,
    /// Ordered counter pairs, e.g. `("Total mismatched addresses", "12")`.
    pub summary: Vec<(String, String)>,
}

impl ExtraData {
    /// Whether every payload field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
            && self.invalid_values.is_empty()
            && self.records.is_empty()
            && self.summary.is_empty()
    }
}

/// A single data-quality finding produced by a check.
///
/// Immutable after construction. `check_name` and `message` are guaranteed
/// non-empty by [`Issue::new`]; the severity is guaranteed valid by the type.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    check_name: String,
    severity: Severity,
    message: String,
    details: Option<String>,
    extra_data: Option<ExtraData>,
}

impl Issue {
    /// Build a validated issue.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::EmptyCheckName`] or [`IssueError::EmptyMessage`]
    /// when the corresponding field is empty after trimming.
    pub fn new(
        check_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<Self, IssueError> {
        let check_name = check_name.into();
        let message = message.into();
        if check_name.trim().is_empty() {
            return Err(IssueError::EmptyCheckName);
        }
        if message.trim().is_empty() {
            return Err(IssueError::EmptyMessage);
        }
        Ok(Self {
            check_name,
            severity,
            message,
            details: None,
            extra_data: None,
        })
    }

    /// Attach long-form detail text.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach a structured payload. An all-empty payload is dropped.
    #[must_use]
    pub fn with_extra_data(mut self, extra_data: ExtraData) -> Self {
        self.extra_data = if extra_data.is_empty() {
            None
        } else {
            Some(extra_data)
        };
        self
    }

    /// Name of the check that produced this issue.
    #[must_use]
    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    /// Urgency level.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Short human-readable summary.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Long-form detail text, if any.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Structured payload, if any.
    #[must_use]
    pub fn extra_data(&self) -> Option<&ExtraData> {
        self.extra_data.as_ref()
    }
}

/// Issue counts per severity. All three severities are always present,
/// zero-seeded, so renderers never need a missing-key branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    /// Count of low-severity issues.
    pub low: usize,
    /// Count of medium-severity issues.
    pub medium: usize,
    /// Count of high-severity issues.
    pub high: usize,
}

impl SeverityCounts {
    /// Count for one severity.
    #[must_use]
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }

    /// Sum across all severities.
    #[must_use]
    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Aggregate statistics over an [`IssueCollection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Total number of issues.
    pub total_issues: usize,
    /// Per-severity counts.
    pub by_severity: SeverityCounts,
    /// Per-check counts in first-seen check order.
    pub by_check: Vec<(String, usize)>,
    /// Number of distinct producing checks.
    pub unique_checks: usize,
}

/// Ordered sequence of issues, insertion order preserved.
///
/// Each check produces one collection per run; the manager owns a top-level
/// collection that absorbs them via [`IssueCollection::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueCollection {
    issues: Vec<Issue>,
}

impl IssueCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one issue.
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Concatenate another collection onto this one. `other`'s issues keep
    /// their relative order and follow all existing issues.
    pub fn merge(&mut self, other: IssueCollection) {
        self.issues.extend(other.issues);
    }

    /// Number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether the collection holds no issues.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Iterate issues in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    /// Group issues by producing check, preserving the first-seen order of
    /// check names and insertion order within each group.
    #[must_use]
    pub fn group_by_check(&self) -> Vec<(&str, Vec<&Issue>)> {
        let mut groups: Vec<(&str, Vec<&Issue>)> = Vec::new();
        for issue in &self.issues {
            match groups.iter_mut().find(|(name, _)| *name == issue.check_name()) {
                Some((_, members)) => members.push(issue),
                None => groups.push((issue.check_name(), vec![issue])),
            }
        }
        groups
    }

    /// Count issues per severity, zero-seeded for all three levels.
    #[must_use]
    pub fn count_by_severity(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for issue in &self.issues {
            match issue.severity() {
                Severity::Low => counts.low += 1,
                Severity::Medium => counts.medium += 1,
                Severity::High => counts.high += 1,
            }
        }
        counts
    }

    /// Aggregate statistics: totals, severity counts, per-check counts.
    #[must_use]
    pub fn summary(&self) -> CollectionSummary {
        let by_check: Vec<(String, usize)> = self
            .group_by_check()
            .into_iter()
            .map(|(name, members)| (name.to_owned(), members.len()))
            .collect();
        CollectionSummary {
            total_issues: self.issues.len(),
            by_severity: self.count_by_severity(),
            unique_checks: by_check.len(),
            by_check,
        }
    }
}

impl<'a> IntoIterator for &'a IssueCollection {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

impl IntoIterator for IssueCollection {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_issue(check: &str, severity: Severity, message: &str) -> Issue {
        Issue::new(check, severity, message).unwrap()
    }

    // ── Severity tests ───────────────────────────────────────────────────

    #[test]
    fn test_severity_parses_lowercase_names() {
        assert_eq!("low".parse::<Severity>().unwrap(), Severity::Low);
        assert_eq!("medium".parse::<Severity>().unwrap(), Severity::Medium);
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
    }

    #[test]
    fn test_severity_rejects_unknown_values() {
        assert!(matches!(
            "critical".parse::<Severity>(),
            Err(IssueError::InvalidSeverity(v)) if v == "critical"
        ));
    }

    #[test]
    fn test_severity_rejects_wrong_case() {
        assert!("High".parse::<Severity>().is_err());
        assert!("LOW".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_display_round_trip() {
        for severity in [Severity::Low, Severity::Medium, Severity::High] {
            assert_eq!(severity.to_string().parse::<Severity>().unwrap(), severity);
        }
    }

    // ── Issue construction tests ─────────────────────────────────────────

    #[test]
    fn test_issue_requires_check_name() {
        assert_eq!(
            Issue::new("", Severity::Low, "something"),
            Err(IssueError::EmptyCheckName)
        );
        assert_eq!(
            Issue::new("   ", Severity::Low, "something"),
            Err(IssueError::EmptyCheckName)
        );
    }

    #[test]
    fn test_issue_requires_message() {
        assert_eq!(
            Issue::new("SomeCheck", Severity::Low, ""),
            Err(IssueError::EmptyMessage)
        );
    }

    #[test]
    fn test_issue_valid_construction() {
        let issue = make_issue("SomeCheck", Severity::High, "broken");
        assert_eq!(issue.check_name(), "SomeCheck");
        assert_eq!(issue.severity(), Severity::High);
        assert_eq!(issue.message(), "broken");
        assert!(issue.details().is_none());
        assert!(issue.extra_data().is_none());
    }

    #[test]
    fn test_issue_with_details_and_extra_data() {
        let extra = ExtraData {
            invalid_values: vec!["Baghdad2".to_owned()],
            ..ExtraData::default()
        };
        let issue = make_issue("SomeCheck", Severity::Medium, "bad city")
            .with_details("found during nightly run")
            .with_extra_data(extra);
        assert_eq!(issue.details(), Some("found during nightly run"));
        assert_eq!(
            issue.extra_data().unwrap().invalid_values,
            vec!["Baghdad2".to_owned()]
        );
    }

    #[test]
    fn test_issue_drops_all_empty_extra_data() {
        let issue =
            make_issue("SomeCheck", Severity::Low, "msg").with_extra_data(ExtraData::default());
        assert!(issue.extra_data().is_none());
    }

    // ── Record tests ─────────────────────────────────────────────────────

    #[test]
    fn test_record_preserves_column_order() {
        let record = Record::new().with("id", "7").with("city", "Basra");
        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["id", "city"]);
        assert_eq!(record.get("city"), Some("Basra"));
        assert_eq!(record.get("missing"), None);
    }

    // ── Collection tests ─────────────────────────────────────────────────

    #[test]
    fn test_collection_starts_empty() {
        let collection = IssueCollection::new();
        assert!(collection.is_empty());
        assert_eq!(collection.len(), 0);
    }

    #[test]
    fn test_merge_concatenates_preserving_order() {
        let mut a = IssueCollection::new();
        a.push(make_issue("A", Severity::Low, "a1"));
        a.push(make_issue("A", Severity::Low, "a2"));

        let mut b = IssueCollection::new();
        b.push(make_issue("B", Severity::High, "b1"));

        a.merge(b);
        let messages: Vec<&str> = a.iter().map(Issue::message).collect();
        assert_eq!(messages, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_group_by_check_first_seen_order() {
        let mut collection = IssueCollection::new();
        collection.push(make_issue("Beta", Severity::Low, "1"));
        collection.push(make_issue("Alpha", Severity::Low, "2"));
        collection.push(make_issue("Beta", Severity::Low, "3"));

        let groups = collection.group_by_check();
        let names: Vec<&str> = groups.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["Beta", "Alpha"]);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn test_group_sizes_sum_to_len() {
        let mut collection = IssueCollection::new();
        for (check, n) in [("A", 3), ("B", 1), ("C", 4)] {
            for i in 0..n {
                collection.push(make_issue(check, Severity::Medium, &format!("m{i}")));
            }
        }
        let grouped: usize = collection
            .group_by_check()
            .iter()
            .map(|(_, members)| members.len())
            .sum();
        assert_eq!(grouped, collection.len());
    }

    #[test]
    fn test_identical_payloads_stay_under_separate_checks() {
        // Two checks reporting the same offending value must not collapse
        // into one group.
        let extra = ExtraData {
            invalid_values: vec!["Baghdad2".to_owned()],
            ..ExtraData::default()
        };
        let mut collection = IssueCollection::new();
        collection
            .push(make_issue("A", Severity::Medium, "Invalid Values").with_extra_data(extra.clone()));
        collection.push(make_issue("B", Severity::Medium, "Invalid Values").with_extra_data(extra));

        let groups = collection.group_by_check();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "A");
        assert_eq!(groups[1].0, "B");
    }

    #[test]
    fn test_count_by_severity_zero_seeded() {
        let mut collection = IssueCollection::new();
        collection.push(make_issue("A", Severity::High, "x"));
        collection.push(make_issue("A", Severity::High, "y"));

        let counts = collection.count_by_severity();
        assert_eq!(counts.low, 0);
        assert_eq!(counts.medium, 0);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.get(Severity::Low), 0);
    }

    #[test]
    fn test_summary_counts() {
        let mut collection = IssueCollection::new();
        collection.push(make_issue("A", Severity::Low, "1"));
        collection.push(make_issue("B", Severity::High, "2"));
        collection.push(make_issue("A", Severity::Medium, "3"));

        let summary = collection.summary();
        assert_eq!(summary.total_issues, 3);
        assert_eq!(summary.unique_checks, 2);
        assert_eq!(
            summary.by_check,
            vec![("A".to_owned(), 2), ("B".to_owned(), 1)]
        );
        assert_eq!(summary.by_severity.low, 1);
        assert_eq!(summary.by_severity.medium, 1);
        assert_eq!(summary.by_severity.high, 1);
    }
}

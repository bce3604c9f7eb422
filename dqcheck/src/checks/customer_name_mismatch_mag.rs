//! Name consistency between storefront customers and their addresses.
//!
//! Joins `customer_entity` to its `customer_address_entity` rows and reports
//! addresses whose firstname or lastname differs from the customer record.

use mysql::Params;

use crate::checks::{Check, CheckError};
use crate::config::AppConfig;
use crate::db;
use crate::types::{ExtraData, Issue, IssueCollection, Record, Severity};

const CHECK_NAME: &str = "CustomerNameMismatchMag";

const MISMATCH_QUERY: &str = "\
    SELECT \
        ce.entity_id  AS customer_id, \
        ce.firstname  AS customer_firstname, \
        ce.lastname   AS customer_lastname, \
        cae.entity_id AS address_id, \
        cae.firstname AS address_firstname, \
        cae.lastname  AS address_lastname \
    FROM customer_entity AS ce \
    JOIN customer_address_entity AS cae \
        ON cae.parent_id = ce.entity_id \
    WHERE ce.firstname <> cae.firstname \
       OR ce.lastname <> cae.lastname \
    ORDER BY ce.entity_id, cae.entity_id";

/// Validates that address names match the owning customer's names.
pub struct CustomerNameMismatchMag;

/// One mismatched address row, already display-converted.
#[derive(Debug)]
struct Mismatch {
    customer_id: String,
    customer_firstname: String,
    customer_lastname: String,
    address_id: String,
    address_firstname: String,
    address_lastname: String,
}

/// NULL and empty name parts both render as `(NULL)`.
fn name_or_placeholder(value: Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "(NULL)".to_owned(),
    }
}

fn to_record(mismatch: &Mismatch) -> Record {
    Record::new()
        .with("customer_id", mismatch.customer_id.clone())
        .with("customer_firstname", mismatch.customer_firstname.clone())
        .with("customer_lastname", mismatch.customer_lastname.clone())
        .with("address_id", mismatch.address_id.clone())
        .with("address_firstname", mismatch.address_firstname.clone())
        .with("address_lastname", mismatch.address_lastname.clone())
}

/// Build the single mismatch issue, or none when the query found nothing.
fn build_issue(mismatches: &[Mismatch]) -> Result<Option<Issue>, CheckError> {
    if mismatches.is_empty() {
        return Ok(None);
    }

    let mut customer_ids: Vec<&str> = mismatches
        .iter()
        .map(|m| m.customer_id.as_str())
        .collect();
    customer_ids.sort_unstable();
    customer_ids.dedup();
    let unique_customers = customer_ids.len();

    let extra = ExtraData {
        records: mismatches.iter().map(to_record).collect(),
        summary: vec![
            (
                "Total mismatched addresses".to_owned(),
                mismatches.len().to_string(),
            ),
            (
                "Unique customers affected".to_owned(),
                unique_customers.to_string(),
            ),
        ],
        ..ExtraData::default()
    };

    let issue = Issue::new(
        CHECK_NAME,
        Severity::Medium,
        format!(
            "Found {} address(es) with mismatched customer names",
            mismatches.len()
        ),
    )?
    .with_details(format!(
        "Found {} address record(s) where customer name does not match the \
         customer entity name, affecting {} unique customer(s)",
        mismatches.len(),
        unique_customers
    ))
    .with_extra_data(extra);

    Ok(Some(issue))
}

impl Check for CustomerNameMismatchMag {
    fn name(&self) -> &'static str {
        CHECK_NAME
    }

    fn source_id(&self) -> &'static str {
        "customer_name_mismatch_mag"
    }

    fn failure_message(&self) -> &'static str {
        "Error executing customer name mismatch check"
    }

    fn collect(&self, config: &AppConfig) -> Result<IssueCollection, CheckError> {
        let mut conn = db::connect(&config.magento)?;
        let rows = db::query_rows(&mut conn, MISMATCH_QUERY, Params::Empty)?;

        let mismatches: Vec<Mismatch> = rows
            .iter()
            .map(|row| Mismatch {
                customer_id: db::u64_at(row, 0)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "(NULL)".to_owned()),
                customer_firstname: name_or_placeholder(db::string_at(row, 1)),
                customer_lastname: name_or_placeholder(db::string_at(row, 2)),
                address_id: db::u64_at(row, 3)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "(NULL)".to_owned()),
                address_firstname: name_or_placeholder(db::string_at(row, 4)),
                address_lastname: name_or_placeholder(db::string_at(row, 5)),
            })
            .collect();

        let mut issues = IssueCollection::new();
        if let Some(issue) = build_issue(&mismatches)? {
            issues.push(issue);
        }
        Ok(issues)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

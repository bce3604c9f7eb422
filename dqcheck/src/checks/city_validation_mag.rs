//! City validation for storefront customer addresses.
//!
//! Flags `customer_address_entity` rows whose `city` is not one of the known
//! governorate names, is NULL, or is empty. Each category produces its own
//! medium-severity issue with per-row detail records.

use mysql::{Params, Value};

use crate::checks::{Check, CheckError};
use crate::config::AppConfig;
use crate::db;
use crate::types::{ExtraData, Issue, IssueCollection, Record, Severity};

const CHECK_NAME: &str = "CityValidationMag";

/// Known-good city names for customer addresses.
const VALID_CITIES: &[&str] = &[
    "Baghdad",
    "Karbala",
    "Babel",
    "Diwaniyah",
    "Najaf",
    "Basra",
    "Maysan",
    "Saladin",
    "Anbar",
    "Dhi Qar",
    "Wasit",
    "Muthanna",
    "Kirkuk",
    "Sulaymaniyah",
    "Erbil",
    "Dohuk",
    "Nineveh",
    "Diyala",
    "Halabja",
];

/// Validates that storefront customer-address cities come from the allowed
/// list.
pub struct CityValidationMag;

/// Address rows split by what is wrong with their city value.
#[derive(Debug, Default)]
struct CityPartition {
    /// (address id, offending city name)
    invalid: Vec<(String, String)>,
    /// Address ids with a NULL city.
    null_ids: Vec<String>,
    /// Address ids with an empty-string city.
    empty_ids: Vec<String>,
}

impl CityPartition {
    fn add(&mut self, id: String, city: Option<String>) {
        match city {
            None => self.null_ids.push(id),
            Some(city) if city.is_empty() => self.empty_ids.push(id),
            Some(city) => self.invalid.push((id, city)),
        }
    }
}

/// Sorted, deduplicated city names from the invalid partition.
fn unique_invalid_cities(invalid: &[(String, String)]) -> Vec<String> {
    let mut cities: Vec<String> = invalid.iter().map(|(_, city)| city.clone()).collect();
    cities.sort();
    cities.dedup();
    cities
}

/// Build the up-to-three issues for a partition.
fn build_issues(partition: &CityPartition) -> Result<IssueCollection, CheckError> {
    let mut issues = IssueCollection::new();

    if !partition.invalid.is_empty() {
        let cities = unique_invalid_cities(&partition.invalid);
        let records: Vec<Record> = partition
            .invalid
            .iter()
            .map(|(id, city)| Record::new().with("id", id.clone()).with("city", city.clone()))
            .collect();
        let extra = ExtraData {
            invalid_values: cities.clone(),
            records,
            summary: vec![
                ("Unique invalid cities".to_owned(), cities.len().to_string()),
                (
                    "Affected addresses".to_owned(),
                    partition.invalid.len().to_string(),
                ),
            ],
            ..ExtraData::default()
        };
        issues.push(
            Issue::new(
                CHECK_NAME,
                Severity::Medium,
                format!(
                    "Found {} invalid city name(s) in customer addresses",
                    cities.len()
                ),
            )?
            .with_details(format!(
                "Found {} unique invalid city name(s) affecting {} address record(s)",
                cities.len(),
                partition.invalid.len()
            ))
            .with_extra_data(extra),
        );
    }

    if !partition.null_ids.is_empty() {
        let records: Vec<Record> = partition
            .null_ids
            .iter()
            .map(|id| Record::new().with("id", id.clone()).with("city", "(NULL)"))
            .collect();
        let extra = ExtraData {
            records,
            summary: vec![(
                "NULL cities".to_owned(),
                partition.null_ids.len().to_string(),
            )],
            ..ExtraData::default()
        };
        issues.push(
            Issue::new(
                CHECK_NAME,
                Severity::Medium,
                format!(
                    "Found {} address(es) with NULL city value",
                    partition.null_ids.len()
                ),
            )?
            .with_details(format!(
                "Found {} address record(s) with NULL city value",
                partition.null_ids.len()
            ))
            .with_extra_data(extra),
        );
    }

    if !partition.empty_ids.is_empty() {
        let records: Vec<Record> = partition
            .empty_ids
            .iter()
            .map(|id| Record::new().with("id", id.clone()).with("city", "(Empty)"))
            .collect();
        let extra = ExtraData {
            records,
            summary: vec![(
                "Empty cities".to_owned(),
                partition.empty_ids.len().to_string(),
            )],
            ..ExtraData::default()
        };
        issues.push(
            Issue::new(
                CHECK_NAME,
                Severity::Medium,
                format!(
                    "Found {} address(es) with empty city value",
                    partition.empty_ids.len()
                ),
            )?
            .with_details(format!(
                "Found {} address record(s) with empty city value",
                partition.empty_ids.len()
            ))
            .with_extra_data(extra),
        );
    }

    Ok(issues)
}

impl Check for CityValidationMag {
    fn name(&self) -> &'static str {
        CHECK_NAME
    }

    fn source_id(&self) -> &'static str {
        "city_validation_mag"
    }

    fn failure_message(&self) -> &'static str {
        "Error executing city validation check"
    }

    fn collect(&self, config: &AppConfig) -> Result<IssueCollection, CheckError> {
        let mut conn = db::connect(&config.magento)?;
        let query = format!(
            "SELECT entity_id, city \
             FROM customer_address_entity \
             WHERE (city NOT IN ({}) OR city IS NULL OR city = '') \
             ORDER BY entity_id",
            db::in_placeholders(VALID_CITIES.len())
        );
        let params = Params::Positional(VALID_CITIES.iter().map(|c| Value::from(*c)).collect());
        let rows = db::query_rows(&mut conn, &query, params)?;

        let mut partition = CityPartition::default();
        for row in &rows {
            let id = db::u64_at(row, 0)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(NULL)".to_owned());
            partition.add(id, db::string_at(row, 1));
        }

        build_issues(&partition)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

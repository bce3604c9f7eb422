//! Missing image attributes on storefront products.
//!
//! For each image attribute and store scope 0-2, reports products that have
//! the attribute populated somewhere but no value row for that scope in
//! `catalog_product_entity_varchar`.

use std::collections::HashSet;

use mysql::{Params, Value};

use crate::checks::{Check, CheckError};
use crate::config::AppConfig;
use crate::db;
use crate::types::{ExtraData, Issue, IssueCollection, Record, Severity};

const CHECK_NAME: &str = "MissingProductImagesMag";

/// Image attribute codes to check.
const IMAGE_ATTRIBUTES: &[&str] = &["image", "small_image", "thumbnail", "swatch_image"];

/// Validates that products have their image attributes set per store scope.
pub struct MissingProductImagesMag;

/// One missing-value row from the gap query.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Gap {
    attribute_id: u64,
    store_id: u64,
    entity_id: u64,
    attribute_code: String,
}

/// Drop repeated (attribute, store, product) combinations, keeping the
/// first occurrence order.
fn dedupe_gaps(gaps: Vec<Gap>) -> Vec<Gap> {
    let mut seen: HashSet<(u64, u64, u64)> = HashSet::new();
    let mut unique = Vec::new();
    for gap in gaps {
        if seen.insert((gap.attribute_id, gap.store_id, gap.entity_id)) {
            unique.push(gap);
        }
    }
    unique
}

/// Per-attribute-code gap counts in first-seen order.
fn attribute_counts(gaps: &[Gap]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for gap in gaps {
        match counts.iter_mut().find(|(code, _)| *code == gap.attribute_code) {
            Some((_, n)) => *n += 1,
            None => counts.push((gap.attribute_code.clone(), 1)),
        }
    }
    counts
}

fn to_record(gap: &Gap) -> Record {
    Record::new()
        .with("id", gap.entity_id.to_string())
        .with("attribute_id", gap.attribute_id.to_string())
        .with("attribute_code", gap.attribute_code.clone())
        .with("store_id", gap.store_id.to_string())
}

/// Build the single missing-images issue, or none when nothing is missing.
fn build_issue(gaps: &[Gap]) -> Result<Option<Issue>, CheckError> {
    if gaps.is_empty() {
        return Ok(None);
    }

    let mut product_ids: Vec<u64> = gaps.iter().map(|g| g.entity_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    let unique_products = product_ids.len();

    let mut summary = vec![
        ("Total missing attributes".to_owned(), gaps.len().to_string()),
        (
            "Unique products affected".to_owned(),
            unique_products.to_string(),
        ),
    ];
    for (code, count) in attribute_counts(gaps) {
        summary.push((format!("Missing '{code}'"), count.to_string()));
    }

    let extra = ExtraData {
        records: gaps.iter().map(to_record).collect(),
        summary,
        ..ExtraData::default()
    };

    let issue = Issue::new(
        CHECK_NAME,
        Severity::Medium,
        format!("Found {} missing product image attribute(s)", gaps.len()),
    )?
    .with_details(format!(
        "Found {} missing image attribute value(s) affecting {} unique product(s)",
        gaps.len(),
        unique_products
    ))
    .with_extra_data(extra);

    Ok(Some(issue))
}

impl Check for MissingProductImagesMag {
    fn name(&self) -> &'static str {
        CHECK_NAME
    }

    fn source_id(&self) -> &'static str {
        "missing_product_images_mag"
    }

    fn failure_message(&self) -> &'static str {
        "Error executing missing product images check"
    }

    fn collect(&self, config: &AppConfig) -> Result<IssueCollection, CheckError> {
        let mut conn = db::connect(&config.magento)?;
        let query = format!(
            "SELECT ea.attribute_id, s.store_id, p.entity_id, ea.attribute_code \
             FROM catalog_product_entity AS p \
             CROSS JOIN (SELECT 0 AS store_id UNION SELECT 1 UNION SELECT 2) AS s \
             CROSS JOIN eav_attribute AS ea \
             LEFT JOIN catalog_product_entity_varchar AS cpev \
                 ON cpev.entity_id = p.entity_id \
                 AND cpev.attribute_id = ea.attribute_id \
                 AND cpev.store_id = s.store_id \
             LEFT JOIN ( \
                 SELECT entity_id, attribute_id, value \
                 FROM catalog_product_entity_varchar \
                 WHERE value IS NOT NULL \
             ) AS src \
                 ON src.entity_id = p.entity_id \
                 AND src.attribute_id = ea.attribute_id \
             WHERE ea.attribute_code IN ({}) \
               AND cpev.value IS NULL \
               AND src.value IS NOT NULL",
            db::in_placeholders(IMAGE_ATTRIBUTES.len())
        );
        let params =
            Params::Positional(IMAGE_ATTRIBUTES.iter().map(|a| Value::from(*a)).collect());
        let rows = db::query_rows(&mut conn, &query, params)?;

        // Skip rows with a NULL key field; the WHERE clause should prevent
        // them, duplicated combinations it cannot.
        let gaps: Vec<Gap> = rows
            .iter()
            .filter_map(|row| {
                Some(Gap {
                    attribute_id: db::u64_at(row, 0)?,
                    store_id: db::u64_at(row, 1)?,
                    entity_id: db::u64_at(row, 2)?,
                    attribute_code: db::string_at(row, 3)?,
                })
            })
            .collect();

        let mut issues = IssueCollection::new();
        if let Some(issue) = build_issue(&dedupe_gaps(gaps))? {
            issues.push(issue);
        }
        Ok(issues)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_gap(attribute_id: u64, store_id: u64, entity_id: u64, code: &str) -> Gap {
        Gap {
            attribute_id,
            store_id,
            entity_id,
            attribute_code: code.to_owned(),
        }
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let gaps = vec![
            make_gap(87, 0, 10, "image"),
            make_gap(88, 0, 10, "small_image"),
            make_gap(87, 0, 10, "image"),
            make_gap(87, 1, 10, "image"),
        ];
        let unique = dedupe_gaps(gaps);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0], make_gap(87, 0, 10, "image"));
        assert_eq!(unique[1], make_gap(88, 0, 10, "small_image"));
        assert_eq!(unique[2], make_gap(87, 1, 10, "image"));
    }

    #[test]
    fn test_attribute_counts_first_seen_order() {
        let gaps = vec![
            make_gap(88, 0, 10, "small_image"),
            make_gap(87, 0, 11, "image"),
            make_gap(88, 1, 12, "small_image"),
        ];
        assert_eq!(
            attribute_counts(&gaps),
            vec![("small_image".to_owned(), 2), ("image".to_owned(), 1)]
        );
    }

    #[test]
    fn test_no_gaps_no_issue() {
        assert!(build_issue(&[]).unwrap().is_none());
    }

    #[test]
    fn test_issue_summary_and_records() {
        let gaps = vec![
            make_gap(87, 0, 10, "image"),
            make_gap(87, 1, 10, "image"),
            make_gap(90, 0, 11, "thumbnail"),
        ];
        let issue = build_issue(&gaps).unwrap().unwrap();
        assert_eq!(issue.severity(), Severity::Medium);
        assert_eq!(
            issue.message(),
            "Found 3 missing product image attribute(s)"
        );
        assert!(issue.details().unwrap().contains("2 unique product(s)"));

        let extra = issue.extra_data().unwrap();
        assert_eq!(extra.records.len(), 3);
        let columns: Vec<&str> = extra.records[0].columns().collect();
        assert_eq!(columns, vec!["id", "attribute_id", "attribute_code", "store_id"]);
        assert_eq!(
            extra.summary,
            vec![
                ("Total missing attributes".to_owned(), "3".to_owned()),
                ("Unique products affected".to_owned(), "2".to_owned()),
                ("Missing 'image'".to_owned(), "2".to_owned()),
                ("Missing 'thumbnail'".to_owned(), "1".to_owned()),
            ]
        );
    }
}
